//! Request metrics and their Prometheus text exposition.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::state::AppState;

/// Upper bounds of the latency histogram, in seconds.
const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RouteKey {
    method: String,
    route: String,
    status: u16,
}

#[derive(Debug, Default)]
struct Histogram {
    buckets: [u64; LATENCY_BUCKETS.len()],
    count: u64,
    sum: f64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        for (bucket, bound) in self.buckets.iter_mut().zip(LATENCY_BUCKETS) {
            if seconds <= bound {
                *bucket += 1;
            }
        }
        self.count += 1;
        self.sum += seconds;
    }
}

/// Process-wide HTTP counters.
#[derive(Debug, Default)]
pub struct Metrics {
    in_flight: AtomicU64,
    rate_limited: AtomicU64,
    requests: Mutex<BTreeMap<RouteKey, u64>>,
    latency: Mutex<BTreeMap<(String, String), Histogram>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn record(&self, method: &str, route: &str, status: u16, seconds: f64) {
        let key = RouteKey {
            method: method.to_string(),
            route: route.to_string(),
            status,
        };
        *self.requests.lock().await.entry(key).or_default() += 1;
        self.latency
            .lock()
            .await
            .entry((method.to_string(), route.to_string()))
            .or_default()
            .observe(seconds);
    }

    /// Render every metric in the Prometheus text format.
    pub async fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# HELP dealflow_http_requests_total Completed HTTP requests.\n");
        out.push_str("# TYPE dealflow_http_requests_total counter\n");
        for (key, count) in self.requests.lock().await.iter() {
            let _ = writeln!(
                out,
                "dealflow_http_requests_total{{method=\"{}\",route=\"{}\",status=\"{}\"}} {}",
                key.method,
                escape(&key.route),
                key.status,
                count
            );
        }

        out.push_str("# HELP dealflow_http_request_duration_seconds Request latency.\n");
        out.push_str("# TYPE dealflow_http_request_duration_seconds histogram\n");
        for ((method, route), histogram) in self.latency.lock().await.iter() {
            let labels = format!("method=\"{}\",route=\"{}\"", method, escape(route));
            for (bound, count) in LATENCY_BUCKETS.iter().zip(histogram.buckets) {
                let _ = writeln!(
                    out,
                    "dealflow_http_request_duration_seconds_bucket{{{labels},le=\"{bound}\"}} {count}"
                );
            }
            let _ = writeln!(
                out,
                "dealflow_http_request_duration_seconds_bucket{{{labels},le=\"+Inf\"}} {}",
                histogram.count
            );
            let _ = writeln!(
                out,
                "dealflow_http_request_duration_seconds_sum{{{labels}}} {}",
                histogram.sum
            );
            let _ = writeln!(
                out,
                "dealflow_http_request_duration_seconds_count{{{labels}}} {}",
                histogram.count
            );
        }

        out.push_str("# HELP dealflow_http_requests_in_flight Requests being served.\n");
        out.push_str("# TYPE dealflow_http_requests_in_flight gauge\n");
        let _ = writeln!(
            out,
            "dealflow_http_requests_in_flight {}",
            self.in_flight.load(Ordering::Relaxed)
        );

        out.push_str("# HELP dealflow_rate_limited_total Requests rejected by the rate limiter.\n");
        out.push_str("# TYPE dealflow_rate_limited_total counter\n");
        let _ = writeln!(
            out,
            "dealflow_rate_limited_total {}",
            self.rate_limited.load(Ordering::Relaxed)
        );

        out
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Middleware recording method, route template, status and latency.
///
/// Requests that matched no route are recorded under `unmatched` so that
/// arbitrary paths cannot grow the label set.
pub async fn track_metrics(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    metrics.in_flight.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();
    let response = next.run(request).await;
    metrics.in_flight.fetch_sub(1, Ordering::Relaxed);

    metrics
        .record(
            &method,
            &route,
            response.status().as_u16(),
            started.elapsed().as_secs_f64(),
        )
        .await;
    response
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render().await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_counts_requests_per_route() {
        let metrics = Metrics::new();
        metrics.record("GET", "/api/deals", 200, 0.003).await;
        metrics.record("GET", "/api/deals", 200, 0.2).await;
        metrics.record("POST", "/api/deals", 400, 0.01).await;

        let text = metrics.render().await;
        assert!(text.contains(
            "dealflow_http_requests_total{method=\"GET\",route=\"/api/deals\",status=\"200\"} 2"
        ));
        assert!(text.contains(
            "dealflow_http_requests_total{method=\"POST\",route=\"/api/deals\",status=\"400\"} 1"
        ));
        assert!(text.contains(
            "dealflow_http_request_duration_seconds_bucket{method=\"GET\",route=\"/api/deals\",le=\"0.005\"} 1"
        ));
        assert!(text.contains(
            "dealflow_http_request_duration_seconds_count{method=\"GET\",route=\"/api/deals\"} 2"
        ));
    }

    #[tokio::test]
    async fn test_render_includes_gauges_when_idle() {
        let metrics = Metrics::new();
        metrics.record_rate_limited();

        let text = metrics.render().await;
        assert!(text.contains("dealflow_http_requests_in_flight 0"));
        assert!(text.contains("dealflow_rate_limited_total 1"));
        assert!(text.contains("# TYPE dealflow_http_request_duration_seconds histogram"));
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let mut histogram = Histogram::default();
        histogram.observe(0.02);
        histogram.observe(3.0);
        assert_eq!(histogram.buckets[0], 0);
        assert_eq!(histogram.buckets[2], 1);
        assert_eq!(histogram.buckets[LATENCY_BUCKETS.len() - 1], 2);
        assert_eq!(histogram.count, 2);
    }
}
