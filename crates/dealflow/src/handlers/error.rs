use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use dealflow_core::auth::AuthError as CoreAuthError;
use dealflow_core::deal::{DealError, MemoError};
use dealflow_core::document::DocumentError;
use dealflow_core::fund::FundError;
use dealflow_core::storage::{repository_error_to_status_code, RepositoryError};
use dealflow_core::user::UserError;

use super::authz::AuthzError;

/// Handler error wrapping `anyhow::Error`.
///
/// The status code is chosen by downcasting to the domain error types.
/// Anything unknown is a 500 whose details only reach the log.
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// 400 with a custom message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(anyhow::Error::new(BadRequest(message.into())))
    }

    fn status_code(&self) -> StatusCode {
        let err = &self.0;
        if err.is::<AuthzError>() {
            return StatusCode::FORBIDDEN;
        }
        if let Some(repo_error) = err.downcast_ref::<RepositoryError>() {
            let code = repository_error_to_status_code(repo_error);
            return StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        }
        if let Some(fund_error) = err.downcast_ref::<FundError>() {
            return match fund_error {
                FundError::FundHasAllocations => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
        }
        if let Some(deal_error) = err.downcast_ref::<DealError>() {
            return match deal_error {
                DealError::HasAllocations => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
        }
        if let Some(auth_error) = err.downcast_ref::<CoreAuthError>() {
            return match auth_error {
                CoreAuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                CoreAuthError::SessionNotFound | CoreAuthError::SessionExpired => {
                    StatusCode::UNAUTHORIZED
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if err.is::<MemoError>()
            || err.is::<UserError>()
            || err.is::<DocumentError>()
            || err.is::<BadRequest>()
        {
            return StatusCode::BAD_REQUEST;
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct BadRequest(String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Service unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
