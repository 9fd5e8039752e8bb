//! Infrastructure wiring: pick the document store engine, build the shop
//! workflows and the token codec shared by all handlers.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use shopdesk_auth::{Hs256Jwt, User};
use shopdesk_infra::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, Shop, StoreError, WorkflowError};

use crate::app::errors::ApiError;
use crate::config::{ApiConfig, SeedAdmin};

#[derive(Debug, Clone)]
pub struct AppServices {
    pub shop: Shop,
    pub jwt: Hs256Jwt,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>, jwt: Hs256Jwt) -> Self {
        Self {
            shop: Shop::new(store),
            jwt,
        }
    }

    /// Services over a fresh in-memory store (dev and tests).
    pub fn in_memory(jwt: Hs256Jwt) -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()), jwt)
    }

    /// Services for the configured environment: PostgreSQL when
    /// `DATABASE_URL` is set, in-memory otherwise.
    pub async fn from_config(config: &ApiConfig) -> Result<Self, StoreError> {
        let jwt = Hs256Jwt::new(config.jwt_secret.as_bytes(), config.token_ttl);

        let store: Arc<dyn DocumentStore> = match &config.database_url {
            Some(url) => {
                let store = PostgresDocumentStore::connect(url, config.database_max_connections).await?;
                info!("using postgres document store");
                Arc::new(store)
            }
            None => {
                warn!("DATABASE_URL not set; data is kept in memory and lost on restart");
                Arc::new(InMemoryDocumentStore::new())
            }
        };

        Ok(Self::new(store, jwt))
    }

    /// Create (or promote) the bootstrap administrator.
    pub async fn seed_admin(&self, seed: &SeedAdmin) -> Result<User, WorkflowError> {
        self.shop.ensure_admin(&seed.name, &seed.email, &seed.password).await
    }

    /// Mint a token for a freshly authenticated user.
    pub fn issue_token(&self, user: &User) -> Result<String, ApiError> {
        Ok(self.jwt.issue(user.id, user.role, Utc::now())?)
    }
}
