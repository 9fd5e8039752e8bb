use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::document_store::{DocumentStore, StoreError, UniqueKey, UpdateFn};

#[derive(Debug, Default)]
struct CollectionData {
    docs: BTreeMap<Uuid, JsonValue>,
    keys: HashMap<(String, String), Uuid>,
}

impl CollectionData {
    fn check_keys(&self, collection: &str, id: Uuid, keys: &[UniqueKey]) -> Result<(), StoreError> {
        for key in keys {
            if let Some(owner) = self.keys.get(&(key.name.clone(), key.value.clone())) {
                if *owner != id {
                    return Err(StoreError::duplicate(collection, &key.name));
                }
            }
        }
        Ok(())
    }

    fn reindex(&mut self, id: Uuid, keys: Vec<UniqueKey>) {
        self.keys.retain(|_, owner| *owner != id);
        for key in keys {
            self.keys.insert((key.name, key.value), id);
        }
    }
}

/// In-memory document store for tests/dev.
///
/// One write lock serializes every mutation, which makes `update` atomic.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<HashMap<String, CollectionData>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        body: JsonValue,
        keys: Vec<UniqueKey>,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let data = map.entry(collection.to_string()).or_default();

        if data.docs.contains_key(&id) {
            return Err(StoreError::duplicate(collection, "id"));
        }
        data.check_keys(collection, id, &keys)?;

        data.docs.insert(id, body);
        data.reindex(id, keys);
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<JsonValue>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(collection).and_then(|d| d.docs.get(&id)).cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<JsonValue>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .get(collection)
            .map(|d| d.docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_key(
        &self,
        collection: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<JsonValue>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let Some(data) = map.get(collection) else {
            return Ok(None);
        };
        Ok(data
            .keys
            .get(&(key.to_string(), value.to_string()))
            .and_then(|id| data.docs.get(id))
            .cloned())
    }

    async fn update<'a>(
        &'a self,
        collection: &'a str,
        id: Uuid,
        f: UpdateFn<'a>,
    ) -> Result<JsonValue, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let data = map
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let current = data
            .docs
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        let replacement = f(current)?;
        data.check_keys(collection, id, &replacement.keys)?;

        data.docs.insert(id, replacement.body.clone());
        data.reindex(id, replacement.keys);
        Ok(replacement.body)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let Some(data) = map.get_mut(collection) else {
            return Ok(false);
        };
        let removed = data.docs.remove(&id).is_some();
        if removed {
            data.keys.retain(|_, owner| *owner != id);
        }
        Ok(removed)
    }
}
