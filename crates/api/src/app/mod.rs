//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store engine selection and shared services
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `extract.rs`: extractors with JSON rejections
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router.
pub fn build_app(services: AppServices, cors_allowed_origin: Option<HeaderValue>) -> Router {
    let auth_state = middleware::AuthState {
        jwt: Arc::new(services.jwt.clone()),
        shop: services.shop.clone(),
    };

    routes::router()
        .fallback(fallback)
        .layer(axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware))
        .layer(Extension(Arc::new(services)))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_allowed_origin)),
        )
}

fn cors_layer(origin: Option<HeaderValue>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    match origin {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

async fn fallback() -> errors::ApiError {
    errors::ApiError::not_found("route")
}
