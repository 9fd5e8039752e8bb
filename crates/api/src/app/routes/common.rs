//! Helpers shared by handlers that serve both shoppers and admins.

use shopdesk_core::{CustomerId, Document, OrderId};
use shopdesk_customers::Customer;
use shopdesk_sales::Order;

use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// The customer record linked to the signed-in account.
pub async fn own_customer(services: &AppServices, principal: &PrincipalContext) -> ApiResult<Customer> {
    services
        .shop
        .customer_for_user(principal.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("customer profile"))
}

/// Whether `principal` may see documents belonging to `customer_id`.
pub async fn can_view(
    services: &AppServices,
    principal: &PrincipalContext,
    customer_id: CustomerId,
) -> ApiResult<bool> {
    if principal.is_admin() {
        return Ok(true);
    }
    Ok(services
        .shop
        .customer_for_user(principal.user_id())
        .await?
        .is_some_and(|c| c.id == customer_id))
}

/// Load an order the principal may see. Other shoppers' orders read as missing.
pub async fn visible_order(
    services: &AppServices,
    principal: &PrincipalContext,
    order_id: OrderId,
) -> ApiResult<Order> {
    let order = services
        .shop
        .orders
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;
    if !can_view(services, principal, order.customer_id()).await? {
        return Err(ApiError::not_found("order"));
    }
    Ok(order)
}

/// Newest first.
pub fn sort_orders(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
}
