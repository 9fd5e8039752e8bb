//! Consistent JSON error responses.
//!
//! Every failure leaves the API as `{"success": false, "error": <code>,
//! "message": <text>}` with the status code derived from the error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use shopdesk_auth::{AuthzError, PasswordError, TokenError};
use shopdesk_core::DomainError;
use shopdesk_infra::{StoreError, WorkflowError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidId(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invariant(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Invariant(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::InvalidId(_) => "invalid_id",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Invariant(_) => "invariant_violation",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        json_error(self.status(), self.code(), message)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// "products" -> "product", for messages.
fn resource(collection: &str) -> &str {
    if collection == "settings" {
        return collection;
    }
    collection.strip_suffix('s').unwrap_or(collection)
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::InvariantViolation(msg) => ApiError::Invariant(msg),
            DomainError::InvalidId(msg) => ApiError::InvalidId(msg),
            DomainError::NotFound => ApiError::NotFound("not found".to_string()),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { collection, .. } => ApiError::not_found(resource(&collection)),
            StoreError::Duplicate { collection, key } => ApiError::Conflict(format!(
                "a {} with this {} already exists",
                resource(&collection),
                key
            )),
            StoreError::Rejected(err) => err.into(),
            other @ (StoreError::Serialization(_) | StoreError::Backend(_)) => {
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(value: PasswordError) -> Self {
        match value {
            PasswordError::TooShort | PasswordError::TooLong => ApiError::Validation(value.to_string()),
            PasswordError::Mismatch => ApiError::Unauthorized("invalid credentials".to_string()),
            PasswordError::Hash => ApiError::Internal(value.to_string()),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::Domain(err) => err.into(),
            WorkflowError::Store(err) => err.into(),
            WorkflowError::Password(err) => err.into(),
            WorkflowError::InvalidCredentials => ApiError::Unauthorized(value.to_string()),
            WorkflowError::Suspended => ApiError::Forbidden(value.to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        ApiError::Forbidden(value.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Encoding(_) => ApiError::Internal(value.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x"), StatusCode::BAD_REQUEST),
            (DomainError::invariant("stock"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::conflict("state"), StatusCode::CONFLICT),
            (DomainError::not_found(), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn store_errors_name_the_resource() {
        let err = ApiError::from(StoreError::duplicate("products", "sku"));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "a product with this sku already exists");

        let err = ApiError::from(StoreError::not_found("orders", Uuid::nil()));
        assert_eq!(err.to_string(), "order not found");

        let err = ApiError::from(StoreError::Backend("connection reset".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn workflow_auth_failures() {
        assert_eq!(
            ApiError::from(WorkflowError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(WorkflowError::Suspended).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(WorkflowError::Password(PasswordError::TooShort)).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
