mod error;
mod functions;
mod password;
mod traits;
mod types;

pub use error::AuthError;
pub use functions::{calculate_expiry, generate_session_id, is_session_expired, new_session};
pub use password::{hash_password, hash_password_with_iterations, verify_password, DEFAULT_ITERATIONS};
pub use traits::{Result, SessionRepository};
pub use types::{Session, SessionId};
