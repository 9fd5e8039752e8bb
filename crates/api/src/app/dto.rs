use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use shopdesk_auth::{Role, User};
use shopdesk_core::{CustomerId, OrderId, Page};
use shopdesk_customers::{Address, Customer};
use shopdesk_infra::workflows::CartLine;
use shopdesk_invoicing::{Invoice, InvoiceStatus};
use shopdesk_sales::{PaymentMethod, PaymentStatus};
use shopdesk_settings::StoreSettings;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct CartQuoteRequest {
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    /// Admins order on behalf of a customer; ignored for shoppers.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct IssueInvoiceRequest {
    pub order_id: OrderId,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoidInvoiceRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    /// Loose status label, same synonyms as status changes.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub overdue: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopProductsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

// -------------------------
// Response helpers
// -------------------------

/// Success envelope: the body object plus `"success": true`.
pub fn success(status: StatusCode, body: JsonValue) -> Response {
    let body = match body {
        JsonValue::Object(mut map) => {
            map.insert("success".to_string(), JsonValue::Bool(true));
            JsonValue::Object(map)
        }
        other => json!({ "success": true, "data": other }),
    };
    (status, axum::Json(body)).into_response()
}

pub fn ok(body: JsonValue) -> Response {
    success(StatusCode::OK, body)
}

pub fn created(body: JsonValue) -> Response {
    success(StatusCode::CREATED, body)
}

pub fn page_to_json(page: Page<JsonValue>) -> JsonValue {
    json!({
        "items": page.items,
        "page": page.page,
        "per_page": page.per_page,
        "total": page.total,
    })
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// Public view of an account; the password hash never leaves the server.
pub fn user_to_json(user: &User) -> JsonValue {
    json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email.as_str(),
        "role": user.role,
        "status": user.status,
        "created_at": user.created_at,
        "updated_at": user.updated_at,
    })
}

pub fn customer_to_json(customer: &Customer) -> JsonValue {
    json!(customer)
}

/// Settings as shown to clients; numbering counters stay internal.
pub fn settings_to_json(settings: &StoreSettings) -> JsonValue {
    json!({
        "store_name": settings.store_name,
        "contact_email": settings.contact_email.as_ref().map(|e| e.as_str()),
        "currency": settings.currency,
        "tax_rate_bps": settings.tax_rate_bps,
        "shipping_fee": settings.shipping_fee,
        "free_shipping_threshold": settings.free_shipping_threshold,
        "low_stock_threshold": settings.low_stock_threshold,
        "invoice_due_days": settings.invoice_due_days,
        "updated_at": settings.updated_at,
    })
}

pub fn invoice_to_json(invoice: &Invoice, now: DateTime<Utc>) -> JsonValue {
    let mut body = json!(invoice);
    if let JsonValue::Object(map) = &mut body {
        map.insert("overdue".to_string(), JsonValue::Bool(invoice.is_overdue(now)));
    }
    body
}
