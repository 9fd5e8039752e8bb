use axum::response::Response;
use serde_json::json;

use crate::app::dto;

pub async fn health() -> Response {
    dto::ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
