use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;

use shopdesk_auth::permissions;
use shopdesk_core::{InvoiceId, PageRequest};

use crate::app::dto::{self, InvoiceListQuery, IssueInvoiceRequest, VoidInvoiceRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{ApiJson, ApiQuery, OptionalApiJson, parse_id};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices).post(issue_invoice))
        .route("/:id", get(get_invoice))
        .route("/:id/pay", post(pay_invoice))
        .route("/:id/void", post(void_invoice))
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiQuery(filter): ApiQuery<InvoiceListQuery>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::INVOICES_MANAGE)?;
    let now = Utc::now();

    let mut invoices = services.shop.invoices.list().await?;
    if let Some(status) = filter.status {
        invoices.retain(|i| i.status() == status);
    }
    if let Some(overdue) = filter.overdue {
        invoices.retain(|i| i.is_overdue(now) == overdue);
    }
    invoices.sort_by(|a, b| b.issued_at().cmp(&a.issued_at()));

    let page = paging.apply(invoices).map(|i| dto::invoice_to_json(&i, now));
    Ok(dto::ok(dto::page_to_json(page)))
}

pub async fn issue_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<IssueInvoiceRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::INVOICES_MANAGE)?;
    let invoice = services.shop.issue_invoice(body.order_id).await?;
    Ok(dto::created(json!({ "invoice": dto::invoice_to_json(&invoice, Utc::now()) })))
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let invoice_id: InvoiceId = parse_id(&id, "invoice")?;
    let invoice = services
        .shop
        .invoices
        .get(invoice_id)
        .await?
        .ok_or_else(|| ApiError::not_found("invoice"))?;
    if !common::can_view(&services, &principal, invoice.customer_id()).await? {
        return Err(ApiError::not_found("invoice"));
    }
    Ok(dto::ok(json!({ "invoice": dto::invoice_to_json(&invoice, Utc::now()) })))
}

pub async fn pay_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::INVOICES_MANAGE)?;
    let invoice_id: InvoiceId = parse_id(&id, "invoice")?;
    let invoice = services.shop.pay_invoice(invoice_id).await?;
    Ok(dto::ok(json!({ "invoice": dto::invoice_to_json(&invoice, Utc::now()) })))
}

/// Body is optional: `{"reason": "..."}`.
pub async fn void_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    OptionalApiJson(body): OptionalApiJson<VoidInvoiceRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &permissions::INVOICES_MANAGE)?;
    let invoice_id: InvoiceId = parse_id(&id, "invoice")?;
    let reason = body.and_then(|b| b.reason);
    let invoice = services.shop.void_invoice(invoice_id, reason).await?;
    Ok(dto::ok(json!({ "invoice": dto::invoice_to_json(&invoice, Utc::now()) })))
}
