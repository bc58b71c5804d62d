use axum::{
    http::{header, Method, StatusCode},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use dealflow_auth::auth_routes;

use crate::{
    handlers::{
        allocations, capital_calls, deals, documents, funds,
        health::{healthz, livez},
        insights, memos, notifications, users,
    },
    metrics::{metrics_handler, track_metrics},
    rate_limit::{rate_limit, RateLimitState},
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let rate_limit_state = RateLimitState {
        limiter: state.rate_limiter.clone(),
        metrics: state.metrics.clone(),
        cookie_name: state.auth.config.cookie_name.clone(),
    };

    let api_routes = Router::new()
        // User routes
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/password", put(users::change_password))
        // Deal routes
        .route("/deals", get(deals::list_deals).post(deals::create_deal))
        .route("/deals/starred", get(deals::list_starred))
        .route(
            "/deals/{id}",
            get(deals::get_deal)
                .put(deals::update_deal)
                .delete(deals::delete_deal),
        )
        .route("/deals/{id}/stage", patch(deals::change_deal_stage))
        .route(
            "/deals/{id}/timeline",
            get(deals::list_timeline).post(deals::add_note),
        )
        .route("/deals/{id}/star", post(deals::toggle_star))
        .route(
            "/deals/{id}/memos",
            get(deals::list_memos).post(deals::create_memo),
        )
        .route(
            "/deals/{id}/assignments",
            get(deals::list_assignments).post(deals::assign_user),
        )
        .route(
            "/deals/{id}/assignments/{user_id}",
            delete(deals::unassign_user),
        )
        .route("/deals/{id}/documents", get(deals::list_deal_documents))
        .route("/deals/{id}/allocations", get(deals::list_deal_allocations))
        // Memo routes
        .route(
            "/memos/{id}",
            put(memos::update_memo).delete(memos::delete_memo),
        )
        .route(
            "/memos/{id}/comments",
            get(memos::list_comments).post(memos::add_comment),
        )
        // Document routes
        .route("/documents", post(documents::upload_document))
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route(
            "/documents/{id}/download",
            get(documents::download_document),
        )
        // Fund routes
        .route("/funds", get(funds::list_funds).post(funds::create_fund))
        .route(
            "/funds/{id}",
            get(funds::get_fund)
                .put(funds::update_fund)
                .delete(funds::delete_fund),
        )
        .route("/funds/{id}/allocations", get(funds::list_fund_allocations))
        .route(
            "/funds/{id}/recalculate-weights",
            post(funds::recalculate_weights),
        )
        // Allocation routes
        .route("/allocations", post(allocations::create_allocation))
        .route(
            "/allocations/{id}",
            get(allocations::get_allocation)
                .put(allocations::update_allocation)
                .delete(allocations::delete_allocation),
        )
        .route(
            "/allocations/{id}/capital-calls",
            get(allocations::list_allocation_calls).post(allocations::create_capital_call),
        )
        .route(
            "/allocations/{id}/capital-calls/schedule",
            post(allocations::schedule_capital_calls),
        )
        // Capital call routes
        .route("/capital-calls", get(capital_calls::list_capital_calls))
        .route(
            "/capital-calls/upcoming",
            get(capital_calls::list_upcoming_calls),
        )
        .route(
            "/capital-calls/{id}",
            get(capital_calls::get_capital_call).delete(capital_calls::delete_capital_call),
        )
        .route(
            "/capital-calls/{id}/payments",
            post(capital_calls::record_payment),
        )
        .route(
            "/capital-calls/{id}/status",
            patch(capital_calls::change_call_status),
        )
        // Notification routes
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", patch(notifications::mark_read))
        .route(
            "/notifications/{id}",
            delete(notifications::delete_notification),
        )
        // Insights
        .route("/leaderboard", get(insights::leaderboard))
        .route("/dashboard/stats", get(insights::dashboard_stats))
        .route("/dashboard/activity", get(insights::recent_activity))
        .merge(auth_routes().with_state(state.auth.clone()))
        .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit))
        .layer(cors);

    // Main application router
    Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use dealflow_core::auth::hash_password_with_iterations;
    use dealflow_core::user::{User, UserRole};

    use crate::state::test_config;

    const PASSWORD: &str = "correct-horse-battery";

    struct TestApp {
        app: Router,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_config(test_config())
        }

        fn with_config(config: crate::config::Config) -> Self {
            let state = AppState::for_tests(&config);
            Self {
                app: create_app(state.clone()),
                state,
            }
        }

        /// Insert a user with a cheap password hash and return a session token.
        async fn user(&self, username: &str, role: UserRole) -> (User, String) {
            let user = User::new(
                username,
                format!("{username} Tester"),
                format!("{username}@example.com"),
                role,
            );
            self.state
                .users
                .create_user(&user, &hash_password_with_iterations(PASSWORD, 1_000))
                .await
                .unwrap();

            let (status, body) = self
                .send(
                    "POST",
                    "/api/auth/login",
                    None,
                    Some(json!({ "username": username, "password": PASSWORD })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "login failed: {body}");
            (user, body["token"].as_str().unwrap().to_string())
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("Authorization", format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, value)
        }
    }

    #[tokio::test]
    async fn test_probes() {
        let t = TestApp::new();

        let (status, _) = t.send("GET", "/livez", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = t.send("GET", "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["funds"], 0);
    }

    #[tokio::test]
    async fn test_api_requires_authentication() {
        let t = TestApp::new();

        let (status, _) = t.send("GET", "/api/deals", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = t
            .send("GET", "/api/deals", Some("not-a-session"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let t = TestApp::new();
        t.user("ada", UserRole::Analyst).await;

        let (status, body) = t
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "username": "ada", "password": "wrong-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_deal_lifecycle() {
        let t = TestApp::new();
        let (_, token) = t.user("ada", UserRole::Analyst).await;
        let token = Some(token.as_str());

        let (status, deal) = t
            .send(
                "POST",
                "/api/deals",
                token,
                Some(json!({ "name": "Acme Robotics", "sector": "Robotics" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = deal["id"].as_str().unwrap().to_string();

        let (status, _) = t
            .send(
                "PATCH",
                &format!("/api/deals/{id}/stage"),
                token,
                Some(json!({ "stage": "rejected" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, moved) = t
            .send(
                "PATCH",
                &format!("/api/deals/{id}/stage"),
                token,
                Some(json!({ "stage": "diligence" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["stage"], "diligence");

        let (status, star) = t
            .send("POST", &format!("/api/deals/{id}/star"), token, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(star["starred"], true);
        assert_eq!(star["star_count"], 1);

        let (status, _) = t
            .send(
                "POST",
                &format!("/api/deals/{id}/memos"),
                token,
                Some(json!({ "thesis": "Category leader", "score": 8 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, summary) = t.send("GET", &format!("/api/deals/{id}"), token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["starred_by_me"], true);
        assert_eq!(summary["memo_count"], 1);

        let (_, timeline) = t
            .send("GET", &format!("/api/deals/{id}/timeline"), token, None)
            .await;
        let kinds: Vec<&str> = timeline
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["event_type"].as_str())
            .collect();
        assert!(kinds.contains(&"created"));
        assert!(kinds.contains(&"stage_change"));
        assert!(kinds.contains(&"memo_added"));

        let (_, starred) = t
            .send("GET", "/api/deals?starred=true", token, None)
            .await;
        assert_eq!(starred.as_array().unwrap().len(), 1);

        let (_, board) = t.send("GET", "/api/leaderboard", token, None).await;
        assert_eq!(board[0]["name"], "Acme Robotics");
        assert_eq!(board[0]["rank"], 1);

        // Analysts may not delete deals
        let (status, _) = t
            .send("DELETE", &format!("/api/deals/{id}"), token, None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_observer_is_read_only() {
        let t = TestApp::new();
        let (_, token) = t.user("otto", UserRole::Observer).await;

        let (status, body) = t
            .send(
                "POST",
                "/api/deals",
                Some(&token),
                Some(json!({ "name": "Nope" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("permission"));

        let (status, _) = t.send("GET", "/api/deals", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fund_ledger_flow() {
        let t = TestApp::new();
        let (_, token) = t.user("pat", UserRole::Partner).await;
        let token = Some(token.as_str());

        let (_, deal) = t
            .send("POST", "/api/deals", token, Some(json!({ "name": "Borealis" })))
            .await;
        let deal_id = deal["id"].as_str().unwrap().to_string();

        let (status, fund) = t
            .send(
                "POST",
                "/api/funds",
                token,
                Some(json!({ "name": "Fund I", "target_size": 1_000_000, "currency": "usd" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(fund["currency"], "USD");
        let fund_id = fund["id"].as_str().unwrap().to_string();

        let (status, body) = t
            .send(
                "POST",
                "/api/allocations",
                token,
                Some(json!({ "fund_id": fund_id, "deal_id": deal_id, "amount": 2_000_000 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, allocation) = t
            .send(
                "POST",
                "/api/allocations",
                token,
                Some(json!({ "fund_id": fund_id, "deal_id": deal_id, "amount": 100_000 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(allocation["portfolio_weight"], 100.0);
        let allocation_id = allocation["id"].as_str().unwrap().to_string();

        let (_, deal) = t
            .send("GET", &format!("/api/deals/{deal_id}"), token, None)
            .await;
        assert_eq!(deal["stage"], "invested");

        let (status, calls) = t
            .send(
                "POST",
                &format!("/api/allocations/{allocation_id}/capital-calls/schedule"),
                token,
                Some(json!({ "frequency": "single" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{calls}");
        assert_eq!(calls[0]["call_amount"], 100_000);
        let call_id = calls[0]["id"].as_str().unwrap().to_string();

        let (status, call) = t
            .send(
                "POST",
                &format!("/api/capital-calls/{call_id}/payments"),
                token,
                Some(json!({ "amount": 40_000 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(call["status"], "partially_paid");
        assert_eq!(call["outstanding"], 60_000);

        let (status, _) = t
            .send(
                "POST",
                &format!("/api/capital-calls/{call_id}/payments"),
                token,
                Some(json!({ "amount": 60_001 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, allocation) = t
            .send("GET", &format!("/api/allocations/{allocation_id}"), token, None)
            .await;
        assert_eq!(allocation["paid_amount"], 40_000);
        assert_eq!(allocation["status"], "partially_paid");

        let (_, detail) = t
            .send("GET", &format!("/api/funds/{fund_id}"), token, None)
            .await;
        assert_eq!(detail["summary"]["committed_capital"], 100_000);
        assert_eq!(detail["summary"]["called_capital"], 40_000);
        assert_eq!(detail["summary"]["uncalled_capital"], 60_000);

        let (status, _) = t
            .send("DELETE", &format!("/api/capital-calls/{call_id}"), token, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = t
            .send("DELETE", &format!("/api/funds/{fund_id}"), token, None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = t
            .send("DELETE", &format!("/api/deals/{deal_id}"), token, None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, stats) = t.send("GET", "/api/dashboard/stats", token, None).await;
        assert_eq!(stats["invested_count"], 1);
        assert_eq!(stats["total_called"], 40_000);
    }

    #[tokio::test]
    async fn test_analyst_cannot_manage_funds() {
        let t = TestApp::new();
        let (_, token) = t.user("ada", UserRole::Analyst).await;

        let (status, _) = t
            .send(
                "POST",
                "/api/funds",
                Some(&token),
                Some(json!({ "name": "Side Fund" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_assignment_notifies_assignee() {
        let t = TestApp::new();
        let (_, lead) = t.user("lead", UserRole::Partner).await;
        let (analyst, analyst_token) = t.user("ada", UserRole::Analyst).await;

        let (_, deal) = t
            .send("POST", "/api/deals", Some(&lead), Some(json!({ "name": "Cobalt" })))
            .await;
        let deal_id = deal["id"].as_str().unwrap();

        let (status, _) = t
            .send(
                "POST",
                &format!("/api/deals/{deal_id}/assignments"),
                Some(&lead),
                Some(json!({ "user_id": analyst.id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, count) = t
            .send("GET", "/api/notifications/unread-count", Some(&analyst_token), None)
            .await;
        assert_eq!(count["unread"], 1);

        let (_, list) = t
            .send("GET", "/api/notifications", Some(&analyst_token), None)
            .await;
        let notification_id = list[0]["id"].as_str().unwrap().to_string();
        assert_eq!(list[0]["kind"], "deal_assigned");

        // Someone else's notification behaves as missing
        let (status, _) = t
            .send(
                "PATCH",
                &format!("/api/notifications/{notification_id}/read"),
                Some(&lead),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = t
            .send(
                "PATCH",
                &format!("/api/notifications/{notification_id}/read"),
                Some(&analyst_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, count) = t
            .send("GET", "/api/notifications/unread-count", Some(&analyst_token), None)
            .await;
        assert_eq!(count["unread"], 0);
    }

    #[tokio::test]
    async fn test_memo_comment_and_ownership() {
        let t = TestApp::new();
        let (_, author) = t.user("ada", UserRole::Analyst).await;
        let (_, other) = t.user("bob", UserRole::Analyst).await;

        let (_, deal) = t
            .send("POST", "/api/deals", Some(&author), Some(json!({ "name": "Delta" })))
            .await;
        let deal_id = deal["id"].as_str().unwrap();
        let (_, memo) = t
            .send(
                "POST",
                &format!("/api/deals/{deal_id}/memos"),
                Some(&author),
                Some(json!({ "thesis": "Strong team", "score": 7 })),
            )
            .await;
        let memo_id = memo["id"].as_str().unwrap();

        let (status, _) = t
            .send(
                "PUT",
                &format!("/api/memos/{memo_id}"),
                Some(&other),
                Some(json!({ "score": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = t
            .send(
                "POST",
                &format!("/api/memos/{memo_id}/comments"),
                Some(&other),
                Some(json!({ "content": "What about churn?" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, count) = t
            .send("GET", "/api/notifications/unread-count", Some(&author), None)
            .await;
        assert_eq!(count["unread"], 1);

        let (status, _) = t
            .send(
                "PUT",
                &format!("/api/memos/{memo_id}"),
                Some(&author),
                Some(json!({ "score": 11 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = t
            .send("DELETE", &format!("/api/memos/{memo_id}"), Some(&author), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = t
            .send("GET", &format!("/api/memos/{memo_id}/comments"), Some(&author), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_document_upload_and_download() {
        let t = TestApp::new();
        let (_, token) = t.user("ada", UserRole::Analyst).await;

        let (_, deal) = t
            .send("POST", "/api/deals", Some(&token), Some(json!({ "name": "Echo" })))
            .await;
        let deal_id = deal["id"].as_str().unwrap();

        let (status, document) = t
            .send(
                "POST",
                "/api/documents",
                Some(&token),
                Some(json!({
                    "deal_id": deal_id,
                    "file_name": "notes.txt",
                    "content_base64": STANDARD.encode("hello"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(document["size_bytes"], 5);
        let document_id = document["id"].as_str().unwrap();

        let response = t
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/documents/{document_id}/download"))
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"notes.txt\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello");

        // Over the 1 KiB test limit
        let (status, _) = t
            .send(
                "POST",
                "/api/documents",
                Some(&token),
                Some(json!({
                    "deal_id": deal_id,
                    "file_name": "big.bin",
                    "content_base64": STANDARD.encode([0u8; 2048]),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, docs) = t
            .send("GET", &format!("/api/deals/{deal_id}/documents"), Some(&token), None)
            .await;
        assert_eq!(docs.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_document_content_type_must_be_a_media_type() {
        let t = TestApp::new();
        let (_, token) = t.user("ada", UserRole::Analyst).await;
        let (_, deal) = t
            .send("POST", "/api/deals", Some(&token), Some(json!({ "name": "Foxtrot" })))
            .await;
        let deal_id = deal["id"].as_str().unwrap();

        let (status, body) = t
            .send(
                "POST",
                "/api/documents",
                Some(&token),
                Some(json!({
                    "deal_id": deal_id,
                    "file_name": "notes.txt",
                    "content_type": "text/plain\nX-Injected: 1",
                    "content_base64": STANDARD.encode("hello"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("content type"));

        let (_, docs) = t
            .send("GET", &format!("/api/deals/{deal_id}/documents"), Some(&token), None)
            .await;
        assert!(docs.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_allocation_amount_cannot_overflow_capacity() {
        let t = TestApp::new();
        let (_, token) = t.user("pat", UserRole::Partner).await;
        let token = Some(token.as_str());

        let (_, deal) = t
            .send("POST", "/api/deals", token, Some(json!({ "name": "Golf" })))
            .await;
        let deal_id = deal["id"].as_str().unwrap().to_string();
        let (_, fund) = t
            .send(
                "POST",
                "/api/funds",
                token,
                Some(json!({ "name": "Fund II", "target_size": 10_000 })),
            )
            .await;
        let fund_id = fund["id"].as_str().unwrap().to_string();

        let (status, _) = t
            .send(
                "POST",
                "/api/allocations",
                token,
                Some(json!({ "fund_id": fund_id, "deal_id": deal_id, "amount": 6_000 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = t
            .send(
                "POST",
                "/api/allocations",
                token,
                Some(json!({ "fund_id": fund_id, "deal_id": deal_id, "amount": i64::MAX })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = t
            .send(
                "POST",
                "/api/funds",
                token,
                Some(json!({ "name": "Fund III", "target_size": i64::MAX })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, detail) = t
            .send("GET", &format!("/api/funds/{fund_id}"), token, None)
            .await;
        assert_eq!(detail["summary"]["committed_capital"], 6_000);
        assert_eq!(detail["allocations"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_user_management() {
        let t = TestApp::new();
        let (admin, admin_token) = t.user("root", UserRole::Admin).await;
        let (_, analyst_token) = t.user("ada", UserRole::Analyst).await;

        let new_user = json!({
            "username": "newbie",
            "full_name": "New Bie",
            "email": "newbie@example.com",
            "password": "long-enough-password",
            "role": "intern",
        });
        let (status, _) = t
            .send("POST", "/api/users", Some(&analyst_token), Some(new_user.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = t
            .send("POST", "/api/users", Some(&admin_token), Some(new_user.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");

        let (status, _) = t
            .send("POST", "/api/users", Some(&admin_token), Some(new_user))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = t
            .send("DELETE", &format!("/api/users/{}", admin.id), Some(&admin_token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let created_id = created["id"].as_str().unwrap();
        let (status, _) = t
            .send("DELETE", &format!("/api/users/{created_id}"), Some(&admin_token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = t
            .send("GET", &format!("/api/users/{created_id}"), Some(&admin_token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429() {
        let mut config = test_config();
        config.rate_limit_burst = 2;
        config.rate_limit_per_second = 1;
        let t = TestApp::with_config(config);

        for _ in 0..2 {
            let (status, _) = t.send("GET", "/api/deals", None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let response = t
            .app
            .clone()
            .oneshot(Request::builder().uri("/api/deals").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        // Probes are outside the limiter
        let (status, _) = t.send("GET", "/livez", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let response = t
            .app
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("dealflow_rate_limited_total 1"));
        assert!(text.contains(
            "dealflow_http_requests_total{method=\"GET\",route=\"/api/deals\",status=\"429\"} 1"
        ));
        assert!(text.contains(
            "dealflow_http_requests_total{method=\"GET\",route=\"/livez\",status=\"200\"} 1"
        ));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let t = TestApp::new();
        let (_, token) = t.user("ada", UserRole::Analyst).await;
        let missing = uuid::Uuid::new_v4();

        for uri in [
            format!("/api/deals/{missing}"),
            format!("/api/funds/{missing}"),
            format!("/api/allocations/{missing}"),
            format!("/api/capital-calls/{missing}"),
            format!("/api/documents/{missing}"),
        ] {
            let (status, body) = t.send("GET", &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(body["error"].is_string());
        }
    }
}
