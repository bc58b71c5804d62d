mod error;
mod operations;
mod requests;
mod types;

pub use error::UserError;
pub use operations::{
    avatar_color_for, derive_initials, validate_avatar_color, validate_email, validate_full_name,
    validate_password, validate_username, MIN_PASSWORD_LENGTH,
};
pub use requests::{ChangePasswordRequest, CreateUserRequest, RegisterRequest, UpdateUserRequest};
pub use types::{User, UserRole};
