//! Role checks for API handlers.
//!
//! Failures map to 403 Forbidden through `AppError`.

use uuid::Uuid;

use dealflow_core::user::{User, UserRole};

/// Authorization error that maps to HTTP 403 Forbidden.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The user's role does not allow the action.
    #[error("Requires {required} permission")]
    InsufficientRole {
        user_id: Uuid,
        role: UserRole,
        required: &'static str,
    },
    /// The action is limited to the owner of a resource.
    #[error("Only the {resource} owner or an admin may do this")]
    NotOwner { user_id: Uuid, resource: &'static str },
}

fn require(user: &User, allowed: bool, required: &'static str) -> Result<(), AuthzError> {
    if allowed {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %user.id,
            role = %user.role,
            required = %required,
            "Authorization denied: insufficient role"
        );
        Err(AuthzError::InsufficientRole {
            user_id: user.id,
            role: user.role,
            required,
        })
    }
}

/// Admins only.
pub fn require_admin(user: &User) -> Result<(), AuthzError> {
    require(user, user.role.can_manage_users(), "admin")
}

/// Admins and partners: funds, allocations and capital calls.
pub fn require_fund_manager(user: &User) -> Result<(), AuthzError> {
    require(user, user.role.can_manage_funds(), "fund management")
}

/// Everyone but observers: deals, memos, comments, stars and documents.
pub fn require_writer(user: &User) -> Result<(), AuthzError> {
    require(user, user.role.can_write_deals(), "write")
}

/// Admins and partners.
pub fn require_deal_deleter(user: &User) -> Result<(), AuthzError> {
    require(user, user.role.can_delete_deals(), "delete")
}

/// The owner of a resource, or an admin.
pub fn require_owner_or_admin(
    user: &User,
    owner_id: Uuid,
    resource: &'static str,
) -> Result<(), AuthzError> {
    if user.id == owner_id || user.role == UserRole::Admin {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, resource = %resource, "Authorization denied: not the owner");
        Err(AuthzError::NotOwner {
            user_id: user.id,
            resource,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User::new("someone", "Some One", "some@example.com", role)
    }

    #[test]
    fn test_role_matrix() {
        assert!(require_admin(&user(UserRole::Admin)).is_ok());
        assert!(require_admin(&user(UserRole::Partner)).is_err());

        assert!(require_fund_manager(&user(UserRole::Partner)).is_ok());
        assert!(require_fund_manager(&user(UserRole::Analyst)).is_err());

        assert!(require_writer(&user(UserRole::Intern)).is_ok());
        assert!(require_writer(&user(UserRole::Observer)).is_err());

        assert!(require_deal_deleter(&user(UserRole::Partner)).is_ok());
        assert!(require_deal_deleter(&user(UserRole::Analyst)).is_err());
    }

    #[test]
    fn test_owner_or_admin() {
        let analyst = user(UserRole::Analyst);
        assert!(require_owner_or_admin(&analyst, analyst.id, "memo").is_ok());
        assert!(require_owner_or_admin(&analyst, Uuid::new_v4(), "memo").is_err());
        assert!(require_owner_or_admin(&user(UserRole::Admin), Uuid::new_v4(), "memo").is_ok());
    }

    #[test]
    fn test_denial_message_names_permission() {
        let err = require_fund_manager(&user(UserRole::Observer)).unwrap_err();
        assert_eq!(err.to_string(), "Requires fund management permission");
    }
}
