use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::error::{optional_text, require_text};
use shopdesk_core::patch::nullable;
use shopdesk_core::{CustomerId, Document, DomainError, DomainResult, Email, UserId};

/// Postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub country: String,
}

impl Address {
    /// Trim every part and reject a missing street, city or country.
    pub fn normalized(self) -> DomainResult<Self> {
        Ok(Self {
            line1: require_text("address.line1", &self.line1)?,
            line2: optional_text(self.line2),
            city: require_text("address.city", &self.city)?,
            state: optional_text(self.state),
            postal_code: optional_text(self.postal_code),
            country: require_text("address.country", &self.country)?,
        })
    }
}

/// Input for [`Customer::create`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update. Absent fields are left untouched; `null` clears optional ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<Address>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl CustomerPatch {
    /// Drop fields a shopper may not change on their own profile.
    pub fn self_service(self) -> Self {
        Self {
            email: None,
            notes: None,
            ..self
        }
    }
}

/// Customer record.
///
/// # Invariants
/// - Name is non-empty.
/// - Email is unique across customers (store `email` key).
/// - At most one linked user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn create(input: NewCustomer, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: CustomerId::new(),
            user_id: None,
            name: require_text("name", &input.name)?,
            email: input.email,
            phone: optional_text(input.phone),
            address: input.address.map(Address::normalized).transpose()?,
            notes: optional_text(input.notes),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update. On error `self` is left unchanged.
    pub fn apply(&mut self, patch: CustomerPatch) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = require_text("name", &name)?;
        }
        if let Some(email) = patch.email {
            next.email = email;
        }
        if let Some(phone) = patch.phone {
            next.phone = optional_text(phone);
        }
        if let Some(address) = patch.address {
            next.address = address.map(Address::normalized).transpose()?;
        }
        if let Some(notes) = patch.notes {
            next.notes = optional_text(notes);
        }

        *self = next;
        Ok(())
    }

    /// Attach a login account. Re-linking the same user is a no-op.
    pub fn link_user(&mut self, user_id: UserId) -> DomainResult<()> {
        match self.user_id {
            Some(existing) if existing == user_id => Ok(()),
            Some(_) => Err(DomainError::conflict(
                "customer is already linked to another account",
            )),
            None => {
                self.user_id = Some(user_id);
                Ok(())
            }
        }
    }
}

impl Document for Customer {
    const COLLECTION: &'static str = "customers";
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        let mut keys = vec![("email", self.email.as_str().to_string())];
        if let Some(user_id) = self.user_id {
            keys.push(("user_id", user_id.to_string()));
        }
        keys
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
