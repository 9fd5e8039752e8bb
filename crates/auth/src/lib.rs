//! `shopdesk-auth` - authentication and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to hash passwords, mint and verify tokens, and decide permissions, but not
//! where users live.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Principal, authorize, permissions_for};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator, TokenError};
pub use password::{PasswordError, hash_password, validate_password, verify_password};
pub use permissions::Permission;
pub use roles::Role;
pub use user::{User, UserStatus};
