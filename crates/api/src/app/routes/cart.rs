use std::sync::Arc;

use axum::{Router, extract::Extension, response::Response, routing::post};
use serde_json::json;

use crate::app::dto::{self, CartQuoteRequest};
use crate::app::errors::ApiResult;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/quote", post(quote))
}

/// Price a cart without reserving anything.
pub async fn quote(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<CartQuoteRequest>,
) -> ApiResult<Response> {
    let quote = services.shop.quote_cart(&body.lines).await?;
    Ok(dto::ok(json!({ "quote": quote })))
}
