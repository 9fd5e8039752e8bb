use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    response::Response,
    routing::{get, post},
};
use serde_json::json;

use shopdesk_auth::permissions;
use shopdesk_core::{PageRequest, ProductId};
use shopdesk_products::{CatalogQuery, NewProduct, ProductPatch, categories};

use crate::app::dto::{self, AdjustStockRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{ApiJson, ApiQuery, parse_id};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{AuthUser, MaybeUser};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(list_categories))
        .route("/:id", get(get_product).patch(update_product).delete(delete_product))
        .route("/:id/stock", post(adjust_stock))
}

/// Browse the catalog. Shoppers only ever see active products.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<CatalogQuery>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> ApiResult<Response> {
    let query = if viewer.is_admin() { query } else { query.storefront() };
    let products = query.apply(services.shop.products.list().await?);
    let page = paging.apply(products).map(|p| json!(p));
    Ok(dto::ok(dto::page_to_json(page)))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let products = services.shop.products.list().await?;
    Ok(dto::ok(json!({ "categories": categories(&products) })))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = services
        .shop
        .products
        .get(product_id)
        .await?
        .filter(|p| viewer.is_admin() || p.is_purchasable())
        .ok_or_else(|| ApiError::not_found("product"))?;
    Ok(dto::ok(json!({ "product": product })))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<NewProduct>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CATALOG_MANAGE)?;
    let product = services.shop.create_product(body).await?;
    Ok(dto::created(json!({ "product": product })))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProductPatch>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CATALOG_MANAGE)?;
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = services.shop.update_product(product_id, body).await?;
    Ok(dto::ok(json!({ "product": product })))
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AdjustStockRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CATALOG_MANAGE)?;
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = services.shop.adjust_stock(product_id, body.delta).await?;
    Ok(dto::ok(json!({ "product": product })))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CATALOG_MANAGE)?;
    let product_id: ProductId = parse_id(&id, "product")?;
    services.shop.delete_product(product_id).await?;
    Ok(dto::ok(json!({ "id": product_id })))
}
