//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::error::require_text;
use shopdesk_core::{Document, DomainError, DomainResult, Email, UserId};

use crate::Role;

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// User is active and can authenticate.
    #[default]
    Active,
    /// User is suspended and cannot authenticate.
    Suspended,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => f.write_str("active"),
            UserStatus::Suspended => f.write_str("suspended"),
        }
    }
}

/// A login account.
///
/// # Invariants
/// - Email is unique across users (enforced by the store's `email` key).
/// - Suspended users cannot authenticate.
///
/// `password_hash` is persisted with the document; API responses are built
/// from explicit DTOs and never include it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn register(
        name: &str,
        email: Email,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = require_text("name", name)?;
        if password_hash.is_empty() {
            return Err(DomainError::validation("password hash cannot be empty"));
        }

        Ok(Self {
            id: UserId::new(),
            name,
            email,
            password_hash,
            role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }

    pub fn suspend(&mut self) -> DomainResult<()> {
        if self.status == UserStatus::Suspended {
            return Err(DomainError::conflict("user is already suspended"));
        }
        self.status = UserStatus::Suspended;
        Ok(())
    }

    pub fn activate(&mut self) -> DomainResult<()> {
        if self.status == UserStatus::Active {
            return Err(DomainError::conflict("user is already active"));
        }
        self.status = UserStatus::Active;
        Ok(())
    }

    pub fn can_authenticate(&self) -> bool {
        self.status == UserStatus::Active
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.as_str().to_string())]
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::register(
            "  Ada Lovelace ",
            Email::parse("Ada@Example.com").unwrap(),
            "$argon2id$placeholder".to_string(),
            Role::Customer,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn register_trims_name_and_keys_on_email() {
        let user = test_user();
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.unique_keys(), vec![("email", "ada@example.com".to_string())]);
        assert!(user.can_authenticate());
    }

    #[test]
    fn register_rejects_blank_name() {
        let err = User::register(
            "   ",
            Email::parse("x@example.com").unwrap(),
            "hash".to_string(),
            Role::Customer,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn suspend_and_activate() {
        let mut user = test_user();
        user.suspend().unwrap();
        assert!(!user.can_authenticate());
        assert!(matches!(user.suspend(), Err(DomainError::Conflict(_))));

        user.activate().unwrap();
        assert!(user.can_authenticate());
        assert!(matches!(user.activate(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(test_user()).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["role"], "customer");
    }
}
