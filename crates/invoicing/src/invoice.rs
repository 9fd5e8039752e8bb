use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::error::optional_text;
use shopdesk_core::{CustomerId, Document, DomainError, DomainResult, InvoiceId, OrderId};
use shopdesk_sales::{Order, OrderLine, OrderStatus, PaymentStatus, Totals};

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Void,
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        })
    }
}

/// Aggregate root: Invoice.
///
/// # Invariants
/// - At most one non-void invoice per order (store `order_id` key, released on void).
/// - Void invoices cannot be paid; paid invoices cannot be voided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    number: String,
    order_id: OrderId,
    order_number: String,
    customer_id: CustomerId,
    lines: Vec<OrderLine>,
    totals: Totals,
    status: InvoiceStatus,
    issued_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    voided_at: Option<DateTime<Utc>>,
    void_reason: Option<String>,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Issue an invoice for `order`. An already-paid order yields a paid invoice.
    pub fn from_order(order: &Order, number: String, due_days: u32, now: DateTime<Utc>) -> DomainResult<Self> {
        if order.status() == OrderStatus::Cancelled {
            return Err(DomainError::conflict(format!(
                "order {} is cancelled and cannot be invoiced",
                order.number()
            )));
        }
        let paid = order.payment_status() == PaymentStatus::Paid;

        Ok(Self {
            id: InvoiceId::new(),
            number,
            order_id: order.id(),
            order_number: order.number().to_string(),
            customer_id: order.customer_id(),
            lines: order.lines().to_vec(),
            totals: order.totals(),
            status: if paid { InvoiceStatus::Paid } else { InvoiceStatus::Unpaid },
            issued_at: now,
            due_at: now + Duration::days(i64::from(due_days)),
            paid_at: paid.then_some(now),
            voided_at: None,
            void_reason: None,
            updated_at: now,
        })
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            InvoiceStatus::Void => Err(DomainError::conflict(format!(
                "invoice {} is void and cannot be paid",
                self.number
            ))),
            InvoiceStatus::Paid => Err(DomainError::conflict(format!(
                "invoice {} is already paid",
                self.number
            ))),
            InvoiceStatus::Unpaid => {
                self.status = InvoiceStatus::Paid;
                self.paid_at = Some(now);
                Ok(())
            }
        }
    }

    pub fn void(&mut self, reason: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            InvoiceStatus::Paid => Err(DomainError::conflict(format!(
                "invoice {} is paid and cannot be voided",
                self.number
            ))),
            InvoiceStatus::Void => Err(DomainError::conflict(format!(
                "invoice {} is already void",
                self.number
            ))),
            InvoiceStatus::Unpaid => {
                self.status = InvoiceStatus::Void;
                self.voided_at = Some(now);
                self.void_reason = optional_text(reason);
                Ok(())
            }
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Unpaid && now > self.due_at
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn voided_at(&self) -> Option<DateTime<Utc>> {
        self.voided_at
    }

    pub fn void_reason(&self) -> Option<&str> {
        self.void_reason.as_deref()
    }
}

impl Document for Invoice {
    const COLLECTION: &'static str = "invoices";
    type Id = InvoiceId;

    fn id(&self) -> InvoiceId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        let mut keys = vec![("number", self.number.clone())];
        if self.status != InvoiceStatus::Void {
            keys.push(("order_id", self.order_id.to_string()));
        }
        keys
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopdesk_core::ProductId;
    use shopdesk_sales::{NewOrder, PaymentMethod, PricingPolicy};

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_order() -> Order {
        Order::place(
            NewOrder {
                number: "ORD-000007".to_string(),
                customer_id: CustomerId::new(),
                lines: vec![OrderLine {
                    product_id: ProductId::new(),
                    sku: "MUG-01".to_string(),
                    name: "Coffee Mug".to_string(),
                    quantity: 3,
                    unit_price: 1_000,
                }],
                payment_method: PaymentMethod::Card,
                shipping_address: None,
                notes: None,
            },
            &PricingPolicy::default(),
            test_time(),
        )
        .unwrap()
    }

    fn test_invoice() -> Invoice {
        Invoice::from_order(&test_order(), "INV-000001".to_string(), 14, test_time()).unwrap()
    }

    #[test]
    fn from_order_copies_totals_and_sets_due_date() {
        let order = test_order();
        let now = test_time();
        let invoice = Invoice::from_order(&order, "INV-000001".to_string(), 14, now).unwrap();

        assert_eq!(invoice.order_id(), order.id());
        assert_eq!(invoice.totals(), order.totals());
        assert_eq!(invoice.status(), InvoiceStatus::Unpaid);
        assert_eq!(invoice.due_at(), now + Duration::days(14));
    }

    #[test]
    fn paid_order_yields_paid_invoice() {
        let mut order = test_order();
        order.set_payment_status(PaymentStatus::Paid).unwrap();
        let invoice = Invoice::from_order(&order, "INV-000002".to_string(), 14, test_time()).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert!(invoice.paid_at().is_some());
    }

    #[test]
    fn cancelled_order_cannot_be_invoiced() {
        let mut order = test_order();
        order.transition(OrderStatus::Cancelled, test_time()).unwrap();
        let err = Invoice::from_order(&order, "INV-000003".to_string(), 14, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn pay_then_pay_again_conflicts() {
        let mut invoice = test_invoice();
        invoice.mark_paid(test_time()).unwrap();
        assert!(matches!(invoice.mark_paid(test_time()), Err(DomainError::Conflict(_))));
        assert!(matches!(invoice.void(None, test_time()), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn void_releases_order_key_and_blocks_payment() {
        let mut invoice = test_invoice();
        assert_eq!(invoice.unique_keys().len(), 2);

        invoice.void(Some(" duplicate ".to_string()), test_time()).unwrap();
        assert_eq!(invoice.void_reason(), Some("duplicate"));
        assert_eq!(invoice.unique_keys(), vec![("number", "INV-000001".to_string())]);
        assert!(invoice.mark_paid(test_time()).is_err());
    }

    #[test]
    fn overdue_only_when_unpaid_past_due() {
        let mut invoice = test_invoice();
        let later = invoice.due_at() + Duration::days(1);
        assert!(!invoice.is_overdue(test_time()));
        assert!(invoice.is_overdue(later));

        invoice.mark_paid(test_time()).unwrap();
        assert!(!invoice.is_overdue(later));
    }
}
