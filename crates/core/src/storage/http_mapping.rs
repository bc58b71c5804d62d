//! HTTP status codes for storage failures.

use super::RepositoryError;

/// Status code a handler should answer with when a repository call fails.
///
/// Missing rows are 404 and unique-key clashes (a taken username, a second
/// star on the same deal) are 409. Constraint violations reported by the
/// backend are the client's fault. Everything else is a server error, with
/// an unreachable database reported as 503 so callers can retry.
///
/// ```
/// use dealflow_core::storage::{repository_error_to_status_code, RepositoryError};
///
/// let missing = RepositoryError::NotFound {
///     entity_type: "CapitalCall",
///     id: "7".to_string(),
/// };
/// assert_eq!(repository_error_to_status_code(&missing), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::AlreadyExists { .. } => 409,
        RepositoryError::InvalidData(_) => 400,
        RepositoryError::ConnectionFailed(_) => 503,
        RepositoryError::QueryFailed(_) | RepositoryError::Serialization(_) => 500,
    }
}
