use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use shopdesk_core::{Document, DomainResult};

use super::document_store::{DocumentStore, Replacement, StoreError, UniqueKey};

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _doc: PhantomData,
        }
    }
}

impl<T> core::fmt::Debug for Collection<T>
where
    T: Document,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collection").field("name", &T::COLLECTION).finish()
    }
}

fn keys_of<T: Document>(doc: &T) -> Vec<UniqueKey> {
    doc.unique_keys()
        .into_iter()
        .map(|(name, value)| UniqueKey::new(name, value))
        .collect()
}

fn decode<T: Document>(body: JsonValue) -> Result<T, StoreError> {
    serde_json::from_value(body).map_err(|e| {
        StoreError::Serialization(format!("failed to decode {} document: {e}", T::COLLECTION))
    })
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _doc: PhantomData,
        }
    }

    pub async fn insert(&self, doc: &T) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        self.store
            .insert(T::COLLECTION, doc.id().into(), body, keys_of(doc))
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, id.into())
            .await?
            .map(decode)
            .transpose()
    }

    /// Like [`Collection::get`], but a missing document is `StoreError::NotFound`.
    pub async fn require(&self, id: T::Id) -> Result<T, StoreError> {
        let uuid: Uuid = id.into();
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, uuid))
    }

    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        self.store
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_one_by(&self, key: &str, value: &str) -> Result<Option<T>, StoreError> {
        self.store
            .find_by_key(T::COLLECTION, key, value)
            .await?
            .map(decode)
            .transpose()
    }

    /// Atomically mutate one document.
    ///
    /// `f` runs against the latest stored state; returning an error aborts the
    /// write (`StoreError::Rejected`). On success the stored document is
    /// touched and returned together with `f`'s result.
    pub async fn update<R, F>(&self, id: T::Id, f: F) -> Result<(T, R), StoreError>
    where
        F: FnOnce(&mut T) -> DomainResult<R> + Send,
        R: Send,
    {
        let mut out: Option<R> = None;
        let slot = &mut out;

        let body = self
            .store
            .update(
                T::COLLECTION,
                id.into(),
                Box::new(move |current: JsonValue| {
                    let mut doc: T = decode(current)?;
                    *slot = Some(f(&mut doc)?);
                    doc.touch(Utc::now());
                    Ok(Replacement {
                        body: serde_json::to_value(&doc)?,
                        keys: keys_of(&doc),
                    })
                }),
            )
            .await?;

        let result = out.ok_or_else(|| {
            StoreError::Backend(format!("{} update did not run its mutation", T::COLLECTION))
        })?;
        Ok((decode(body)?, result))
    }

    /// Returns `false` if the document did not exist.
    pub async fn delete(&self, id: T::Id) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id.into()).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::store::InMemoryDocumentStore;
    use shopdesk_core::{DomainError, ProductId};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: ProductId,
        code: String,
        count: i64,
        updated_at: DateTime<Utc>,
    }

    impl Document for Widget {
        const COLLECTION: &'static str = "widgets";
        type Id = ProductId;

        fn id(&self) -> ProductId {
            self.id
        }

        fn unique_keys(&self) -> Vec<(&'static str, String)> {
            vec![("code", self.code.clone())]
        }

        fn touch(&mut self, now: DateTime<Utc>) {
            self.updated_at = now;
        }
    }

    fn test_collection() -> Collection<Widget> {
        Collection::new(Arc::new(InMemoryDocumentStore::new()))
    }

    fn widget(code: &str) -> Widget {
        Widget {
            id: ProductId::new(),
            code: code.to_string(),
            count: 0,
            updated_at: Utc::now() - chrono::Duration::days(1),
        }
    }

    #[tokio::test]
    async fn typed_round_trip_and_lookup() {
        let widgets = test_collection();
        let w = widget("W-1");
        widgets.insert(&w).await.unwrap();

        assert_eq!(widgets.require(w.id).await.unwrap(), w);
        assert_eq!(widgets.find_one_by("code", "W-1").await.unwrap(), Some(w.clone()));
        assert!(matches!(
            widgets.require(ProductId::new()).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_returns_closure_result_and_touches() {
        let widgets = test_collection();
        let w = widget("W-1");
        widgets.insert(&w).await.unwrap();

        let (updated, previous) = widgets
            .update(w.id, |doc| {
                let previous = doc.count;
                doc.count += 5;
                Ok(previous)
            })
            .await
            .unwrap();

        assert_eq!(previous, 0);
        assert_eq!(updated.count, 5);
        assert!(updated.updated_at > w.updated_at);
        assert_eq!(widgets.require(w.id).await.unwrap().count, 5);
    }

    #[tokio::test]
    async fn rejected_update_surfaces_domain_error() {
        let widgets = test_collection();
        let w = widget("W-1");
        widgets.insert(&w).await.unwrap();

        let err = widgets
            .update(w.id, |_doc| -> DomainResult<()> {
                Err(DomainError::conflict("nope"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn duplicate_key_on_insert() {
        let widgets = test_collection();
        widgets.insert(&widget("W-1")).await.unwrap();
        let err = widgets.insert(&widget("W-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref key, .. } if key == "code"));
    }
}
