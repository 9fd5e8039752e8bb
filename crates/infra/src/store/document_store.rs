use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use shopdesk_core::DomainError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} document {id} not found")]
    NotFound { collection: String, id: Uuid },

    #[error("duplicate {key} in {collection}")]
    Duplicate { collection: String, key: String },

    /// The update closure refused the write; nothing was stored.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("document serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: Uuid) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id,
        }
    }

    pub fn duplicate(collection: &str, key: &str) -> Self {
        Self::Duplicate {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// One entry of a document's unique-key set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub name: String,
    pub value: String,
}

impl UniqueKey {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// New body and unique keys produced by an update closure.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub body: JsonValue,
    pub keys: Vec<UniqueKey>,
}

/// Mutation applied by [`DocumentStore::update`] to the latest committed body.
pub type UpdateFn<'a> = Box<dyn FnOnce(JsonValue) -> Result<Replacement, StoreError> + Send + 'a>;

/// Document storage engine.
///
/// Engines only store and index JSON; typing lives in [`crate::store::Collection`].
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Store a new document. Fails with `Duplicate` if the id or any unique key is taken.
    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        body: JsonValue,
        keys: Vec<UniqueKey>,
    ) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<JsonValue>, StoreError>;

    /// All documents of a collection, oldest id first.
    async fn list(&self, collection: &str) -> Result<Vec<JsonValue>, StoreError>;

    async fn find_by_key(
        &self,
        collection: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<JsonValue>, StoreError>;

    /// Atomic read-modify-write.
    ///
    /// `f` sees the latest committed body and either returns its replacement
    /// or an error, in which case nothing is written. No other write to the
    /// same document can interleave between the read and the write.
    async fn update<'a>(
        &'a self,
        collection: &'a str,
        id: Uuid,
        f: UpdateFn<'a>,
    ) -> Result<JsonValue, StoreError>;

    /// Returns `false` if the document did not exist.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError>;
}
