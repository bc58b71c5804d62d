use thiserror::Error;

/// Errors that can occur when validating users.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("Username must be 3-32 characters of letters, digits, '.', '_' or '-'")]
    InvalidUsername,
    #[error("Full name cannot be empty")]
    EmptyFullName,
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Invalid avatar color: {0}")]
    InvalidAvatarColor(String),
}
