//! Document trait: identity + collection placement for stored records.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// A record persisted as one JSON document in a named collection.
///
/// Documents reference each other by id only; the store never follows
/// references on its own.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name the document lives in.
    const COLLECTION: &'static str;

    /// Strongly-typed document identifier.
    type Id: Copy
        + Eq
        + core::hash::Hash
        + core::fmt::Debug
        + core::fmt::Display
        + Into<Uuid>
        + Send
        + Sync;

    /// Returns the document identifier.
    fn id(&self) -> Self::Id;

    /// Values that must be unique within the collection, as `(key, value)` pairs.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Record a modification. Called by the store on every committed update.
    fn touch(&mut self, now: DateTime<Utc>);
}
