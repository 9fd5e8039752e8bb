use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use shopdesk_auth::{Principal, Role};
use shopdesk_core::UserId;

use crate::app::errors::ApiError;

/// Authenticated identity for a request.
///
/// Inserted by the auth middleware after the token was verified and the
/// account was found active. The role comes from the stored account, so
/// role changes apply without re-issuing tokens.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            principal: Principal::new(user_id, role),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// Extractor for routes that require a signed-in user.
#[derive(Debug, Copy, Clone)]
pub struct AuthUser(pub PrincipalContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .copied()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}

/// Extractor for public routes that behave differently for signed-in users.
#[derive(Debug, Copy, Clone)]
pub struct MaybeUser(pub Option<PrincipalContext>);

impl MaybeUser {
    pub fn is_admin(&self) -> bool {
        self.0.is_some_and(|p| p.is_admin())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<PrincipalContext>().copied()))
    }
}
