use std::sync::Arc;

use axum::{Router, extract::Extension, response::Response, routing::get};
use chrono::{Duration, Utc};
use serde_json::json;

use shopdesk_auth::permissions;
use shopdesk_infra::reports;

use crate::app::dto::{self, SalesQuery, TopProductsQuery};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::ApiQuery;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthUser;

const DEFAULT_SALES_DAYS: i64 = 30;
const DEFAULT_TOP_LIMIT: usize = 10;
const MAX_TOP_LIMIT: usize = 100;

pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/sales", get(sales))
        .route("/top-products", get(top_products))
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::REPORTS_READ)?;
    let shop = &services.shop;
    let orders = shop.orders.list().await?;
    let products = shop.products.list().await?;
    let customer_count = shop.customers.list().await?.len();
    let settings = shop.store_settings().await?;

    let summary = reports::dashboard_summary(&orders, &products, customer_count, &settings, Utc::now());
    Ok(dto::ok(json!({ "summary": summary })))
}

/// Daily revenue; defaults to the last 30 days.
pub async fn sales(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiQuery(range): ApiQuery<SalesQuery>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::REPORTS_READ)?;
    let to = range.to.unwrap_or_else(|| Utc::now().date_naive());
    let from = match range.from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_SALES_DAYS - 1))
            .ok_or_else(|| ApiError::Validation("'to' is out of range".to_string()))?,
    };

    let orders = services.shop.orders.list().await?;
    let days = reports::sales_by_day(&orders, from, to)?;
    Ok(dto::ok(json!({ "from": from, "to": to, "days": days })))
}

pub async fn top_products(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<TopProductsQuery>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::REPORTS_READ)?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT);
    let orders = services.shop.orders.list().await?;
    Ok(dto::ok(json!({ "products": reports::top_products(&orders, limit) })))
}
