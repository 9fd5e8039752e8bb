//! `shopdesk-core` - domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod document;
pub mod email;
pub mod error;
pub mod id;
pub mod money;
pub mod page;
pub mod patch;

pub use document::Document;
pub use email::Email;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, InvoiceId, OrderId, ProductId, SettingsId, UserId};
pub use page::{Page, PageRequest};
