//! API request types for user management.

use serde::{Deserialize, Serialize};

use super::error::UserError;
use super::operations::{
    validate_avatar_color, validate_email, validate_full_name, validate_password,
    validate_username,
};
use super::types::{User, UserRole};
use crate::serde::deserialize_optional_string;

/// Request payload for an admin creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_color: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), UserError> {
        validate_username(&self.username)?;
        validate_full_name(&self.full_name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if let Some(color) = &self.avatar_color {
            validate_avatar_color(color)?;
        }
        Ok(())
    }

    /// Builds the user; the password stays with the request for hashing.
    pub fn to_user(&self) -> User {
        let mut user = User::new(
            self.username.trim(),
            self.full_name.trim(),
            self.email.trim().to_lowercase(),
            self.role,
        );
        if let Some(color) = &self.avatar_color {
            user.avatar_color = color.clone();
        }
        user
    }
}

/// Self-service sign-up payload. Registered users always start as analysts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn into_create_request(self) -> CreateUserRequest {
        CreateUserRequest {
            username: self.username,
            full_name: self.full_name,
            email: self.email,
            password: self.password,
            role: UserRole::Analyst,
            avatar_color: None,
        }
    }
}

/// Request payload for updating a user profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub avatar_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl UpdateUserRequest {
    /// True when the request tries to change the role.
    pub fn changes_role(&self) -> bool {
        self.role.is_some()
    }

    /// Validates and applies the updates to an existing user.
    pub fn apply_to(self, user: &mut User) -> Result<(), UserError> {
        if let Some(full_name) = self.full_name {
            validate_full_name(&full_name)?;
            user.initials = super::operations::derive_initials(&full_name);
            user.full_name = full_name.trim().to_string();
        }
        if let Some(email) = self.email {
            validate_email(&email)?;
            user.email = email.trim().to_lowercase();
        }
        if let Some(color) = self.avatar_color {
            validate_avatar_color(&color)?;
            user.avatar_color = color;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        Ok(())
    }
}

/// Request payload for changing a password.
///
/// `current_password` is required when users change their own password and
/// ignored when an admin resets someone else's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    pub new_password: String,
}
