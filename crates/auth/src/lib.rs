//! Session authentication for dealflow.
//!
//! This crate provides:
//! - Username/password login backed by server-side sessions
//! - Session storage (in-memory, or SQLite via the `sqlite` feature)
//! - Axum extractors for authentication

mod config;
mod error;
mod extractors;
mod handlers;
mod sessions;
mod state;

pub use config::AuthConfig;
pub use error::AuthError;
pub use extractors::{session_token, CurrentUser, OptionalUser};
pub use handlers::{auth_routes, LoginRequest, LoginResponse};
pub use sessions::InMemorySessionStore;
#[cfg(feature = "sqlite")]
pub use sessions::SqliteSessionStore;
pub use state::AuthState;
