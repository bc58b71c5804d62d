//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/healthz` - Storage round trip

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::AppState;

/// GET /livez - Basic liveness probe.
///
/// Returns 200 immediately. Used to check if the server is accepting connections.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /healthz - Storage health.
///
/// Runs one cheap read against the repositories. Returns 503 when storage
/// is unreachable.
#[axum::debug_handler]
pub async fn healthz(State(state): State<AppState>) -> Response {
    match state.funds.list_funds().await {
        Ok(funds) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "funds": funds.len() })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": "storage unreachable" })),
            )
                .into_response()
        }
    }
}
