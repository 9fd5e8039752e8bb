//! Postgres-backed document store.
//!
//! Documents live in one `jsonb` table keyed by `(collection, id)`; unique
//! keys live in a side table whose primary key enforces uniqueness.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |
//!
//! ## Thread Safety
//!
//! `PostgresDocumentStore` is `Send + Sync`; all access goes through the SQLx
//! connection pool.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use super::document_store::{DocumentStore, StoreError, UniqueKey, UpdateFn};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id UUID NOT NULL,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS document_keys (
        collection TEXT NOT NULL,
        key_name TEXT NOT NULL,
        key_value TEXT NOT NULL,
        id UUID NOT NULL,
        PRIMARY KEY (collection, key_name, key_value),
        FOREIGN KEY (collection, id) REFERENCES documents (collection, id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS document_keys_owner_idx ON document_keys (collection, id)
    "#,
];

/// Postgres document store.
///
/// `update` runs in one transaction and locks the row with
/// `SELECT ... FOR UPDATE`, so concurrent updates of the same document are
/// serialized by the database.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if missing. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, body, keys), err)]
    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        body: JsonValue,
        keys: Vec<UniqueKey>,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::duplicate(collection, "id")
            } else {
                map_sqlx_error("insert_document", e)
            }
        })?;

        insert_keys(&mut tx, collection, id, keys).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<JsonValue>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_document", e))?;

        row.map(|r| read_body(&r)).transpose()
    }

    async fn list(&self, collection: &str) -> Result<Vec<JsonValue>, StoreError> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = $1 ORDER BY id ASC")
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_documents", e))?;

        rows.iter().map(read_body).collect()
    }

    async fn find_by_key(
        &self,
        collection: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<JsonValue>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT d.body
            FROM document_keys k
            JOIN documents d ON d.collection = k.collection AND d.id = k.id
            WHERE k.collection = $1 AND k.key_name = $2 AND k.key_value = $3
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_key", e))?;

        row.map(|r| read_body(&r)).transpose()
    }

    #[instrument(skip(self, f), err)]
    async fn update<'a>(
        &'a self,
        collection: &'a str,
        id: Uuid,
        f: UpdateFn<'a>,
    ) -> Result<JsonValue, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_document", e))?
        .ok_or_else(|| StoreError::not_found(collection, id))?;

        // Dropping `tx` on any error below rolls the transaction back.
        let replacement = f(read_body(&row)?)?;

        sqlx::query(
            r#"
            UPDATE documents
            SET body = $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&replacement.body)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_document", e))?;

        sqlx::query("DELETE FROM document_keys WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_keys", e))?;

        insert_keys(&mut tx, collection, id, replacement.keys).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(replacement.body)
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_document", e))?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_keys(
    tx: &mut Transaction<'_, Postgres>,
    collection: &str,
    id: Uuid,
    keys: Vec<UniqueKey>,
) -> Result<(), StoreError> {
    for key in keys {
        sqlx::query(
            r#"
            INSERT INTO document_keys (collection, key_name, key_value, id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(collection)
        .bind(&key.name)
        .bind(&key.value)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::duplicate(collection, &key.name)
            } else {
                map_sqlx_error("insert_key", e)
            }
        })?;
    }
    Ok(())
}

fn read_body(row: &sqlx::postgres::PgRow) -> Result<JsonValue, StoreError> {
    row.try_get::<JsonValue, _>("body")
        .map_err(|e| StoreError::Serialization(format!("failed to read document body: {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
