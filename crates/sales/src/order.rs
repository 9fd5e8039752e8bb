use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::error::optional_text;
use shopdesk_core::money::line_total;
use shopdesk_core::{CustomerId, Document, DomainError, DomainResult, InvoiceId, OrderId, ProductId};
use shopdesk_customers::Address;

use crate::pricing::{PricingPolicy, Totals, price_lines};
use crate::status::{OrderStatus, PaymentMethod, PaymentStatus};

/// Order line: a snapshot of the product at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl OrderLine {
    pub fn total(&self) -> DomainResult<u64> {
        line_total(self.quantity, self.unit_price)
    }
}

/// One entry of the order's status audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
}

/// Follow-up work a status transition requires outside the order document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionEffects {
    /// Reserved stock must be returned to the catalog.
    pub release_stock: bool,
    /// The order needs an invoice.
    pub issue_invoice: bool,
    /// The linked invoice should be voided (order cancelled).
    pub void_invoice: Option<InvoiceId>,
}

impl TransitionEffects {
    pub fn is_empty(&self) -> bool {
        !self.release_stock && !self.issue_invoice && self.void_invoice.is_none()
    }
}

/// Input for [`Order::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub number: String,
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    pub shipping_address: Option<Address>,
    pub notes: Option<String>,
}

/// Aggregate root: Order.
///
/// # Invariants
/// - At least one line; every quantity is >= 1; a product appears once.
/// - `totals` always match `lines` under the policy in force at checkout.
/// - Status only moves along [`OrderStatus::can_transition_to`].
/// - `stock_reserved` is true exactly while the order holds catalog stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    number: String,
    customer_id: CustomerId,
    lines: Vec<OrderLine>,
    totals: Totals,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    shipping_address: Option<Address>,
    notes: Option<String>,
    invoice_id: Option<InvoiceId>,
    stock_reserved: bool,
    status_history: Vec<StatusChange>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order whose stock has already been reserved.
    pub fn place(input: NewOrder, policy: &PricingPolicy, now: DateTime<Utc>) -> DomainResult<Self> {
        ensure_lines(&input.lines)?;
        let totals = price_lines(&input.lines, policy)?;

        Ok(Self {
            id: OrderId::new(),
            number: input.number,
            customer_id: input.customer_id,
            lines: input.lines,
            totals,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: input.payment_method,
            shipping_address: input.shipping_address.map(Address::normalized).transpose()?,
            notes: optional_text(input.notes),
            invoice_id: None,
            stock_reserved: true,
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to `to`, returning the effects the caller must carry out.
    ///
    /// A transition to the current status changes nothing. Cancelling an
    /// already cancelled order reports whatever a failed attempt left behind
    /// (reserved stock, a linked invoice) so it can be finished.
    pub fn transition(&mut self, to: OrderStatus, now: DateTime<Utc>) -> DomainResult<TransitionEffects> {
        if to == self.status {
            return Ok(self.leftover_effects());
        }
        if !self.status.can_transition_to(to) {
            return Err(DomainError::conflict(format!(
                "cannot change order {} from {} to {}",
                self.number, self.status, to
            )));
        }

        let mut effects = TransitionEffects::default();
        match to {
            OrderStatus::Cancelled => {
                effects.release_stock = self.stock_reserved;
                effects.void_invoice = self.invoice_id;
            }
            OrderStatus::Delivered => {
                effects.issue_invoice = self.invoice_id.is_none();
                if self.payment_method == PaymentMethod::CashOnDelivery
                    && self.payment_status == PaymentStatus::Unpaid
                {
                    self.payment_status = PaymentStatus::Paid;
                }
            }
            _ => {}
        }

        self.status_history.push(StatusChange {
            from: self.status,
            to,
            at: now,
        });
        self.status = to;
        Ok(effects)
    }

    fn leftover_effects(&self) -> TransitionEffects {
        let mut effects = TransitionEffects::default();
        if self.status == OrderStatus::Cancelled {
            effects.release_stock = self.stock_reserved;
            effects.void_invoice = self.invoice_id;
        }
        effects
    }

    /// Shoppers may cancel their own order only before it is processed.
    pub fn ensure_customer_cancellable(&self) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::conflict(format!(
                "order {} is {} and can no longer be cancelled",
                self.number, self.status
            )));
        }
        Ok(())
    }

    pub fn set_payment_status(&mut self, to: PaymentStatus) -> DomainResult<()> {
        match (self.payment_status, to) {
            (from, to) if from == to => Ok(()),
            (_, PaymentStatus::Paid) if self.status == OrderStatus::Cancelled => {
                Err(DomainError::conflict("cancelled orders cannot be marked paid"))
            }
            (from, PaymentStatus::Refunded) if from != PaymentStatus::Paid => {
                Err(DomainError::conflict("only paid orders can be refunded"))
            }
            _ => {
                self.payment_status = to;
                Ok(())
            }
        }
    }

    /// Record that reserved stock went back to the catalog.
    /// Returns `false` if nothing was reserved.
    pub fn release_stock(&mut self) -> bool {
        std::mem::replace(&mut self.stock_reserved, false)
    }

    pub fn link_invoice(&mut self, invoice_id: InvoiceId) -> DomainResult<()> {
        match self.invoice_id {
            Some(existing) if existing == invoice_id => Ok(()),
            Some(_) => Err(DomainError::conflict(format!(
                "order {} already has an invoice",
                self.number
            ))),
            None => {
                self.invoice_id = Some(invoice_id);
                Ok(())
            }
        }
    }

    pub fn unlink_invoice(&mut self, invoice_id: InvoiceId) {
        if self.invoice_id == Some(invoice_id) {
            self.invoice_id = None;
        }
    }

    pub fn number(&self) -> &str {
        &self.number
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

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn invoice_id(&self) -> Option<InvoiceId> {
        self.invoice_id
    }

    pub fn stock_reserved(&self) -> bool {
        self.stock_reserved
    }

    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("number", self.number.clone())]
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

fn ensure_lines(lines: &[OrderLine]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("order must have at least one line"));
    }
    let mut seen = HashSet::new();
    for line in lines {
        if line.quantity == 0 {
            return Err(DomainError::validation(format!(
                "quantity for {} must be at least 1",
                line.sku
            )));
        }
        if !seen.insert(line.product_id) {
            return Err(DomainError::validation(format!(
                "product {} appears more than once",
                line.sku
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_line(quantity: u32, unit_price: u64) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(),
            sku: "MUG-01".to_string(),
            name: "Coffee Mug".to_string(),
            quantity,
            unit_price,
        }
    }

    fn test_order(method: PaymentMethod) -> Order {
        Order::place(
            NewOrder {
                number: "ORD-000001".to_string(),
                customer_id: CustomerId::new(),
                lines: vec![test_line(2, 1_000)],
                payment_method: method,
                shipping_address: None,
                notes: Some("  ".to_string()),
            },
            &PricingPolicy {
                tax_rate_bps: 1_000,
                shipping_fee: 300,
                free_shipping_threshold: None,
            },
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn place_prices_and_reserves() {
        let order = test_order(PaymentMethod::Card);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.totals().total, 2_000 + 200 + 300);
        assert!(order.stock_reserved());
        assert_eq!(order.notes(), None);
    }

    #[test]
    fn place_rejects_empty_zero_and_duplicate_lines() {
        let base = NewOrder {
            number: "ORD-000002".to_string(),
            customer_id: CustomerId::new(),
            lines: vec![],
            payment_method: PaymentMethod::Card,
            shipping_address: None,
            notes: None,
        };
        let policy = PricingPolicy::default();

        assert!(Order::place(base.clone(), &policy, test_time()).is_err());

        let zero = NewOrder {
            lines: vec![test_line(0, 100)],
            ..base.clone()
        };
        assert!(Order::place(zero, &policy, test_time()).is_err());

        let line = test_line(1, 100);
        let dup = NewOrder {
            lines: vec![line.clone(), line],
            ..base
        };
        assert!(Order::place(dup, &policy, test_time()).is_err());
    }

    #[test]
    fn same_status_is_a_no_op() {
        let mut order = test_order(PaymentMethod::Card);
        let effects = order.transition(OrderStatus::Pending, test_time()).unwrap();
        assert!(effects.is_empty());
        assert!(order.status_history().is_empty());
    }

    #[test]
    fn cancelling_releases_reserved_stock_once() {
        let mut order = test_order(PaymentMethod::Card);
        let effects = order.transition(OrderStatus::Cancelled, test_time()).unwrap();
        assert!(effects.release_stock);
        assert!(order.release_stock());
        assert!(!order.release_stock());

        assert!(order.transition(OrderStatus::Processing, test_time()).is_err());
        let again = order.transition(OrderStatus::Cancelled, test_time()).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn recancelling_reports_invoice_still_linked() {
        let mut order = test_order(PaymentMethod::Card);
        let invoice = InvoiceId::new();
        order.link_invoice(invoice).unwrap();
        order.transition(OrderStatus::Cancelled, test_time()).unwrap();
        order.release_stock();

        let again = order.transition(OrderStatus::Cancelled, test_time()).unwrap();
        assert_eq!(again.void_invoice, Some(invoice));
        assert!(!again.release_stock);
        assert_eq!(order.status_history().len(), 1);
    }

    #[test]
    fn delivering_requests_invoice_and_pays_cash_on_delivery() {
        let mut order = test_order(PaymentMethod::CashOnDelivery);
        order.transition(OrderStatus::Shipped, test_time()).unwrap();
        let effects = order.transition(OrderStatus::Delivered, test_time()).unwrap();

        assert!(effects.issue_invoice);
        assert!(!effects.release_stock);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.status_history().len(), 2);
        assert_eq!(order.status_history()[1].from, OrderStatus::Shipped);
    }

    #[test]
    fn delivering_with_linked_invoice_issues_nothing() {
        let mut order = test_order(PaymentMethod::Card);
        order.link_invoice(InvoiceId::new()).unwrap();
        let effects = order.transition(OrderStatus::Delivered, test_time()).unwrap();
        assert!(!effects.issue_invoice);
        assert_eq!(order.payment_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn cancelling_reports_linked_invoice() {
        let mut order = test_order(PaymentMethod::Card);
        let invoice = InvoiceId::new();
        order.link_invoice(invoice).unwrap();
        assert!(order.link_invoice(InvoiceId::new()).is_err());

        let effects = order.transition(OrderStatus::Cancelled, test_time()).unwrap();
        assert_eq!(effects.void_invoice, Some(invoice));
    }

    #[test]
    fn customer_cancel_only_while_pending() {
        let mut order = test_order(PaymentMethod::Card);
        assert!(order.ensure_customer_cancellable().is_ok());
        order.transition(OrderStatus::Processing, test_time()).unwrap();
        assert!(matches!(order.ensure_customer_cancellable(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn payment_rules() {
        let mut order = test_order(PaymentMethod::Card);
        assert!(order.set_payment_status(PaymentStatus::Refunded).is_err());
        order.set_payment_status(PaymentStatus::Paid).unwrap();
        order.set_payment_status(PaymentStatus::Refunded).unwrap();

        let mut cancelled = test_order(PaymentMethod::Card);
        cancelled.transition(OrderStatus::Cancelled, test_time()).unwrap();
        assert!(cancelled.set_payment_status(PaymentStatus::Paid).is_err());
    }
}
