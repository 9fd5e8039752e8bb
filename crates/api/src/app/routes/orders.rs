use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    response::Response,
    routing::{get, patch, post},
};
use serde_json::json;

use shopdesk_auth::permissions;
use shopdesk_core::{OrderId, PageRequest};
use shopdesk_infra::workflows::CheckoutRequest;
use shopdesk_sales::OrderStatus;

use crate::app::dto::{self, CheckoutBody, OrderListQuery, PaymentStatusRequest, StatusChangeRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{ApiJson, ApiQuery, parse_id};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/status", patch(change_status))
        .route("/:id/payment", patch(set_payment_status))
        .route("/:id/cancel", post(cancel_order))
}

/// Checkout. Shoppers order for themselves; admins name the customer.
pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::ORDERS_PLACE)?;

    let customer_id = match body.customer_id {
        Some(customer_id) if principal.is_admin() => customer_id,
        None if principal.is_admin() => {
            return Err(ApiError::Validation("customer_id is required".to_string()));
        }
        _ => common::own_customer(&services, &principal).await?.id,
    };

    let order = services
        .shop
        .place_order(CheckoutRequest {
            customer_id,
            lines: body.lines,
            payment_method: body.payment_method,
            shipping_address: body.shipping_address,
            notes: body.notes,
        })
        .await?;
    Ok(dto::created(json!({ "order": order })))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiQuery(filter): ApiQuery<OrderListQuery>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> ApiResult<Response> {
    let status = filter
        .status
        .as_deref()
        .map(OrderStatus::parse_loose)
        .transpose()?;

    let mut orders = if principal.is_admin() {
        let mut all = services.shop.orders.list().await?;
        if let Some(customer_id) = filter.customer_id {
            all.retain(|o| o.customer_id() == customer_id);
        }
        all
    } else {
        authz::require(&principal, &permissions::ORDERS_READ_OWN)?;
        let customer = common::own_customer(&services, &principal).await?;
        services.shop.orders_for_customer(customer.id).await?
    };
    if let Some(status) = status {
        orders.retain(|o| o.status() == status);
    }
    common::sort_orders(&mut orders);

    let page = paging.apply(orders).map(|o| json!(o));
    Ok(dto::ok(dto::page_to_json(page)))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = common::visible_order(&services, &principal, order_id).await?;
    let invoice = match order.invoice_id() {
        Some(invoice_id) => services.shop.invoices.get(invoice_id).await?,
        None => None,
    };
    Ok(dto::ok(json!({ "order": order, "invoice": invoice })))
}

/// Free-form status change, e.g. `{"status": "Out for delivery"}`.
pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusChangeRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::ORDERS_MANAGE)?;
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = services.shop.change_status(order_id, &body.status).await?;
    Ok(dto::ok(json!({ "order": order })))
}

pub async fn set_payment_status(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PaymentStatusRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::ORDERS_MANAGE)?;
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = services.shop.set_payment_status(order_id, body.payment_status).await?;
    Ok(dto::ok(json!({ "order": order })))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = services.shop.cancel_order(order_id, principal.principal()).await?;
    Ok(dto::ok(json!({ "order": order })))
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::ORDERS_MANAGE)?;
    let order_id: OrderId = parse_id(&id, "order")?;
    services.shop.delete_order(order_id).await?;
    Ok(dto::ok(json!({ "id": order_id })))
}
