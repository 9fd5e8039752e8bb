//! Email address value.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A normalized (trimmed, lower-cased) email address.
///
/// Deserialization goes through [`Email::parse`], so a stored or submitted
/// email is always structurally valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let s = s.trim().to_lowercase();
        if s.is_empty() {
            return Err(DomainError::validation("email cannot be empty"));
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(DomainError::validation(format!(
                "email must be at most {} characters",
                Self::MAX_LENGTH
            )));
        }

        let (local, domain) = s
            .split_once('@')
            .ok_or_else(|| DomainError::validation("email must contain an @ symbol"))?;
        if local.is_empty() {
            return Err(DomainError::validation("email local part cannot be empty"));
        }
        if domain.is_empty() || domain.contains('@') {
            return Err(DomainError::validation("email domain is invalid"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email cannot contain whitespace"));
        }

        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let email = Email::parse("  Jane.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Email::parse("").is_err());
        assert!(Email::parse("no-at-symbol").is_err());
        assert!(Email::parse("@domain.com").is_err());
        assert!(Email::parse("user@").is_err());
        assert!(Email::parse("a@b@c").is_err());
        assert!(Email::parse("a b@c.com").is_err());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Email = serde_json::from_str("\"Shop@Example.com\"").unwrap();
        assert_eq!(ok.as_str(), "shop@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
