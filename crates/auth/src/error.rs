use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dealflow_core::storage::{repository_error_to_status_code, RepositoryError};
use dealflow_core::user::UserError;
use serde_json::json;
use thiserror::Error;

/// Auth errors for the dealflow_auth crate.
///
/// This wraps the core `AuthError` and adds the failures of the HTTP layer:
/// missing credentials, disabled sign-up and user storage errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module (credentials, sessions, hashing).
    #[error(transparent)]
    Core(#[from] dealflow_core::auth::AuthError),

    #[error("authentication required")]
    Unauthenticated,

    #[error("registration is disabled")]
    RegistrationDisabled,

    #[error(transparent)]
    Validation(#[from] UserError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        use dealflow_core::auth::AuthError as CoreError;

        match self {
            AuthError::Core(core_err) => match core_err {
                CoreError::InvalidCredentials
                | CoreError::SessionNotFound
                | CoreError::SessionExpired => StatusCode::UNAUTHORIZED,
                CoreError::MalformedHash | CoreError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::RegistrationDisabled => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Repository(e) => StatusCode::from_u16(repository_error_to_status_code(e))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Auth error");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
