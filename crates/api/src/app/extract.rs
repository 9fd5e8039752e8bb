//! Request extractors that reject with the JSON error body instead of
//! axum's plain-text rejections.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::app::errors::ApiError;

/// JSON body extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::Validation(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Query string extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| ApiError::Validation(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// JSON body that may be left out. An empty body is `None`; a body that is
/// sent must parse.
#[derive(Debug, Clone, Default)]
pub struct OptionalApiJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalApiJson(None));
        }
        serde_json::from_slice(&bytes)
            .map(|value| OptionalApiJson(Some(value)))
            .map_err(|err| ApiError::Validation(format!("invalid JSON body: {err}")))
    }
}

/// Parse a path segment into a typed id (`ProductId`, `OrderId`, ...).
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: core::str::FromStr,
{
    raw.parse()
        .map_err(|_| ApiError::InvalidId(format!("invalid {what} id")))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use serde::Deserialize;
    use shopdesk_core::ProductId;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Reason {
        reason: Option<String>,
    }

    async fn optional_body(raw: &'static str) -> Result<Option<Reason>, ApiError> {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(raw))
            .unwrap();
        OptionalApiJson::<Reason>::from_request(req, &()).await.map(|OptionalApiJson(v)| v)
    }

    #[tokio::test]
    async fn optional_body_rejects_bad_json_but_allows_none() {
        assert!(optional_body("").await.unwrap().is_none());
        assert!(optional_body("  \n").await.unwrap().is_none());

        let parsed = optional_body(r#"{"reason":"dup"}"#).await.unwrap().unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("dup"));

        let err = optional_body(r#"{"reason":5}"#).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(matches!(optional_body("{").await, Err(ApiError::Validation(_))));
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let id = ProductId::new();
        assert_eq!(parse_id::<ProductId>(&id.to_string(), "product").unwrap(), id);

        let err = parse_id::<ProductId>("nope", "product").unwrap_err();
        assert_eq!(err.to_string(), "invalid product id");
    }
}
