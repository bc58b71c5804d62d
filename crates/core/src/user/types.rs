use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operations::{avatar_color_for, derive_initials};

/// Role of a team member, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Partner,
    Analyst,
    Observer,
    Intern,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::Admin,
        UserRole::Partner,
        UserRole::Analyst,
        UserRole::Observer,
        UserRole::Intern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Partner => "partner",
            UserRole::Analyst => "analyst",
            UserRole::Observer => "observer",
            UserRole::Intern => "intern",
        }
    }

    /// Parses the storage representation of a role.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }

    /// Create, update and delete other users.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Create funds, allocations and capital calls, and record payments.
    pub fn can_manage_funds(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Partner)
    }

    /// Create and edit deals, memos, comments, stars and documents.
    pub fn can_write_deals(&self) -> bool {
        !matches!(self, UserRole::Observer)
    }

    pub fn can_delete_deals(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Partner)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member of the investment team.
///
/// The password hash lives next to the user in storage but is never part of
/// this type, so a `User` can be serialized into responses and caches safely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub initials: String,
    pub avatar_color: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    /// Creates a user with derived initials and avatar color.
    pub fn new(
        username: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Self {
        let username = username.into();
        let full_name = full_name.into();
        Self {
            id: Uuid::new_v4(),
            initials: derive_initials(&full_name),
            avatar_color: avatar_color_for(&username),
            username,
            full_name,
            email: email.into(),
            role,
            created_at: Utc::now(),
            last_active: None,
        }
    }

    /// Sets a specific ID for this user (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_storage_string() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("superuser"), None);
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Admin.can_manage_users());
        assert!(!UserRole::Partner.can_manage_users());

        assert!(UserRole::Partner.can_manage_funds());
        assert!(!UserRole::Analyst.can_manage_funds());

        assert!(UserRole::Intern.can_write_deals());
        assert!(!UserRole::Observer.can_write_deals());

        assert!(UserRole::Partner.can_delete_deals());
        assert!(!UserRole::Analyst.can_delete_deals());
    }

    #[test]
    fn test_new_user_derives_profile_fields() {
        let user = User::new("jdoe", "Jane Doe", "jane@example.com", UserRole::Analyst);
        assert_eq!(user.initials, "JD");
        assert!(user.avatar_color.starts_with('#'));
        assert!(user.last_active.is_none());
    }

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&UserRole::Partner).unwrap();
        assert_eq!(json, "\"partner\"");
    }
}
