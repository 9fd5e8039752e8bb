use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    response::Response,
    routing::get,
};
use serde_json::json;

use shopdesk_auth::permissions;
use shopdesk_core::{CustomerId, PageRequest};
use shopdesk_customers::{Customer, CustomerPatch, NewCustomer};
use shopdesk_infra::reports;

use crate::app::dto::{self, CustomerListQuery};
use crate::app::errors::ApiResult;
use crate::app::extract::{ApiJson, ApiQuery, parse_id};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthUser;

const RECENT_ORDERS: usize = 10;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/me", get(get_own_profile).patch(update_own_profile))
        .route("/:id", get(get_customer).patch(update_customer).delete(delete_customer))
}

fn matches_search(customer: &Customer, needle: &str) -> bool {
    customer.name.to_lowercase().contains(needle)
        || customer.email.as_str().contains(needle)
        || customer
            .phone
            .as_deref()
            .is_some_and(|p| p.to_lowercase().contains(needle))
}

pub async fn get_own_profile(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CUSTOMERS_SELF)?;
    let customer = common::own_customer(&services, &principal).await?;
    Ok(dto::ok(json!({ "customer": dto::customer_to_json(&customer) })))
}

pub async fn update_own_profile(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<CustomerPatch>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CUSTOMERS_SELF)?;
    let customer = services.shop.update_own_profile(principal.user_id(), body).await?;
    Ok(dto::ok(json!({ "customer": dto::customer_to_json(&customer) })))
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiQuery(filter): ApiQuery<CustomerListQuery>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CUSTOMERS_MANAGE)?;

    let mut customers = services.shop.customers.list().await?;
    if let Some(needle) = filter.q.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty()) {
        customers.retain(|c| matches_search(c, &needle));
    }
    customers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let page = paging.apply(customers).map(|c| dto::customer_to_json(&c));
    Ok(dto::ok(dto::page_to_json(page)))
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<NewCustomer>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CUSTOMERS_MANAGE)?;
    let customer = services.shop.create_customer(body).await?;
    Ok(dto::created(json!({ "customer": dto::customer_to_json(&customer) })))
}

/// Customer detail with lifetime stats and their latest orders.
pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CUSTOMERS_MANAGE)?;
    let customer_id: CustomerId = parse_id(&id, "customer")?;
    let customer = services.shop.customers.require(customer_id).await?;
    let orders = services.shop.orders_for_customer(customer_id).await?;
    let stats = reports::customer_stats(&orders, customer_id);
    let recent: Vec<_> = orders.iter().take(RECENT_ORDERS).collect();

    Ok(dto::ok(json!({
        "customer": dto::customer_to_json(&customer),
        "stats": stats,
        "recent_orders": recent,
    })))
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CustomerPatch>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CUSTOMERS_MANAGE)?;
    let customer_id: CustomerId = parse_id(&id, "customer")?;
    let customer = services.shop.update_customer(customer_id, body).await?;
    Ok(dto::ok(json!({ "customer": dto::customer_to_json(&customer) })))
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::CUSTOMERS_MANAGE)?;
    let customer_id: CustomerId = parse_id(&id, "customer")?;
    services.shop.delete_customer(customer_id).await?;
    Ok(dto::ok(json!({ "id": customer_id })))
}
