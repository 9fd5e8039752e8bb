//! Document storage.
//!
//! Documents are JSON bodies addressed by `(collection, id)`. Engines also
//! maintain a unique-key index so that e.g. two users cannot share an email.
//!
//! - [`DocumentStore`]: object-safe async engine trait
//! - [`InMemoryDocumentStore`]: tests/dev
//! - [`PostgresDocumentStore`]: `jsonb` rows
//! - [`Collection`]: typed, serde-backed view over one collection

pub mod collection;
pub mod document_store;
pub mod in_memory;
pub mod postgres;

pub use collection::Collection;
pub use document_store::{DocumentStore, Replacement, StoreError, UniqueKey, UpdateFn};
pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
