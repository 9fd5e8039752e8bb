use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use shopdesk_auth::JwtValidator;
use shopdesk_infra::Shop;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub shop: Shop,
}

/// Resolve the bearer token, if any, into a [`PrincipalContext`].
///
/// Requests without an `Authorization` header pass through anonymously;
/// handlers that need a user reject them via the `AuthUser` extractor. A
/// header that is present but invalid is rejected right here.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: axum::extract::Request, next: Next) -> Response {
    match resolve(&state, req.headers()).await {
        Ok(Some(principal)) => {
            req.extensions_mut().insert(principal);
        }
        Ok(None) => {}
        Err(err) => return err.into_response(),
    }
    next.run(req).await
}

async fn resolve(state: &AuthState, headers: &HeaderMap) -> Result<Option<PrincipalContext>, ApiError> {
    let Some(token) = extract_bearer(headers)? else {
        return Ok(None);
    };

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized("invalid or expired token".to_string())
    })?;

    let user = state
        .shop
        .users
        .get(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;
    if !user.can_authenticate() {
        return Err(ApiError::Forbidden("account is suspended".to_string()));
    }

    Ok(Some(PrincipalContext::new(user.id, user.role)))
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let malformed = || ApiError::Unauthorized("malformed authorization header".to_string());

    let header = header.to_str().map_err(|_| malformed())?;
    let token = header.strip_prefix("Bearer ").ok_or_else(malformed)?.trim();
    if token.is_empty() {
        return Err(malformed());
    }

    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(extract_bearer(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn bearer_token_is_extracted() {
        let h = headers("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&h).unwrap(), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(extract_bearer(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer(&headers("Bearer   ")).is_err());
    }
}
