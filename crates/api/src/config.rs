//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//! - `JWT_SECRET` - token signing secret (insecure dev default when unset)
//! - `BIND_ADDR` - listen address (default: 0.0.0.0:8080)
//! - `DATABASE_URL` - PostgreSQL document store; in-memory when unset
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! - `TOKEN_TTL_MINUTES` - token lifetime (default: 1440)
//! - `CORS_ALLOWED_ORIGIN` - single allowed origin; permissive when unset
//! - `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD` / `SEED_ADMIN_NAME` - bootstrap admin

use std::net::SocketAddr;

use axum::http::HeaderValue;
use chrono::Duration;
use thiserror::Error;

use shopdesk_core::Email;

pub const DEV_JWT_SECRET: &str = "shopdesk-dev-secret";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 1440;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Credentials for the administrator created at startup.
#[derive(Clone)]
pub struct SeedAdmin {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `true` when `JWT_SECRET` was not provided.
    pub insecure_jwt_secret: bool,
    pub token_ttl: Duration,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub cors_allowed_origin: Option<HeaderValue>,
    pub seed_admin: Option<SeedAdmin>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"[REDACTED]")
            .field("insecure_jwt_secret", &self.insecure_jwt_secret)
            .field("token_ttl", &self.token_ttl)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("database_max_connections", &self.database_max_connections)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .field("seed_admin", &self.seed_admin)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let (jwt_secret, insecure_jwt_secret) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let ttl_minutes = match get("TOKEN_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| invalid("TOKEN_TTL_MINUTES", "must be a positive integer"))?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("DATABASE_MAX_CONNECTIONS", "must be a positive integer"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let cors_allowed_origin = get("CORS_ALLOWED_ORIGIN")
            .map(|origin| HeaderValue::from_str(&origin).map_err(|e| invalid("CORS_ALLOWED_ORIGIN", e)))
            .transpose()?;

        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin {
                name: get("SEED_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email: Email::parse(&email).map_err(|e| invalid("SEED_ADMIN_EMAIL", e))?,
                password,
            }),
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("SEED_ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("SEED_ADMIN_EMAIL".to_string())),
            (None, None) => None,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            insecure_jwt_secret,
            token_ttl: Duration::minutes(ttl_minutes),
            database_url: get("DATABASE_URL"),
            database_max_connections,
            cors_allowed_origin,
            seed_admin,
        })
    }
}

fn invalid(key: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), err.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert!(config.insecure_jwt_secret);
        assert_eq!(config.token_ttl, Duration::minutes(1440));
        assert!(config.database_url.is_none());
        assert!(config.cors_allowed_origin.is_none());
        assert!(config.seed_admin.is_none());
    }

    #[test]
    fn explicit_values_are_parsed() {
        let config = load(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cr3t"),
            ("TOKEN_TTL_MINUTES", "15"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("CORS_ALLOWED_ORIGIN", "http://localhost:5173"),
            ("SEED_ADMIN_EMAIL", "Admin@Shop.test"),
            ("SEED_ADMIN_PASSWORD", "password123"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.jwt_secret, "s3cr3t");
        assert!(!config.insecure_jwt_secret);
        assert_eq!(config.token_ttl, Duration::minutes(15));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        let admin = config.seed_admin.unwrap();
        assert_eq!(admin.email.as_str(), "admin@shop.test");
        assert_eq!(admin.name, "Administrator");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("BIND_ADDR", "not-an-addr")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "BIND_ADDR"
        ));
        assert!(matches!(
            load(&[("TOKEN_TTL_MINUTES", "0")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "TOKEN_TTL_MINUTES"
        ));
        assert_eq!(
            load(&[("SEED_ADMIN_EMAIL", "a@b.co")]).unwrap_err(),
            ConfigError::MissingEnvVar("SEED_ADMIN_PASSWORD".to_string())
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&[("JWT_SECRET", "top-secret-value")]).unwrap();
        assert!(!format!("{config:?}").contains("top-secret-value"));
    }
}
