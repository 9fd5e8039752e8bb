use chrono::Utc;
use tracing::{info, instrument, warn};

use shopdesk_auth::Principal;
use shopdesk_core::{Document, DomainError, InvoiceId, OrderId};
use shopdesk_invoicing::InvoiceStatus;
use shopdesk_sales::{Order, OrderStatus, PaymentStatus, TransitionEffects};

use super::{Shop, WorkflowResult};
use crate::store::StoreError;

impl Shop {
    /// Apply a free-form status label to an order and carry out its effects.
    #[instrument(skip(self))]
    pub async fn change_status(&self, order_id: OrderId, raw_status: &str) -> WorkflowResult<Order> {
        let to = OrderStatus::parse_loose(raw_status)?;
        let (order, effects) = self
            .orders
            .update(order_id, move |o| o.transition(to, Utc::now()))
            .await?;
        if !effects.is_empty() {
            info!(order_id = %order_id, status = %to, ?effects, "order status changed");
        }
        self.apply_effects(order, effects).await
    }

    /// Cancel an order. Shoppers may only cancel their own pending orders.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn cancel_order(&self, order_id: OrderId, actor: &Principal) -> WorkflowResult<Order> {
        let order = self.orders.require(order_id).await?;
        let admin = actor.is_admin();
        if !admin {
            let own = self
                .customer_for_user(actor.user_id)
                .await?
                .is_some_and(|c| c.id == order.customer_id());
            if !own {
                return Err(StoreError::not_found(Order::COLLECTION, order_id.into()).into());
            }
        }

        let (order, effects) = self
            .orders
            .update(order_id, move |o| {
                if !admin {
                    o.ensure_customer_cancellable()?;
                }
                o.transition(OrderStatus::Cancelled, Utc::now())
            })
            .await?;
        info!(order_id = %order_id, by_admin = admin, "order cancelled");
        self.apply_effects(order, effects).await
    }

    /// Set the payment status; paying an order also settles its invoice.
    #[instrument(skip(self))]
    pub async fn set_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> WorkflowResult<Order> {
        let (order, ()) = self
            .orders
            .update(order_id, move |o| o.set_payment_status(status))
            .await?;

        if status == PaymentStatus::Paid {
            if let Some(invoice_id) = order.invoice_id() {
                self.settle_invoice(invoice_id).await?;
            }
        }
        info!(order_id = %order_id, payment_status = %status, "payment status updated");
        Ok(order)
    }

    /// Remove an order, first returning any stock it still holds.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> WorkflowResult<()> {
        let order = self.orders.require(order_id).await?;
        if order.status() != OrderStatus::Delivered {
            self.release_order_stock(order_id).await?;
        }
        if let Some(invoice_id) = order.invoice_id() {
            self.void_if_unpaid(invoice_id, "order deleted").await?;
        }
        if !self.orders.delete(order_id).await? {
            return Err(StoreError::not_found(Order::COLLECTION, order_id.into()).into());
        }
        info!(order_id = %order_id, number = %order.number(), "order deleted");
        Ok(())
    }

    pub(crate) async fn apply_effects(&self, order: Order, effects: TransitionEffects) -> WorkflowResult<Order> {
        let order_id = order.id();
        let mut latest = order;

        if effects.release_stock {
            if let Some(updated) = self.release_order_stock(order_id).await? {
                latest = updated;
            }
        }
        if let Some(invoice_id) = effects.void_invoice {
            if self.void_if_unpaid(invoice_id, "order cancelled").await? {
                let (updated, ()) = self
                    .orders
                    .update(order_id, move |o| {
                        o.unlink_invoice(invoice_id);
                        Ok(())
                    })
                    .await?;
                latest = updated;
            }
        }
        if effects.issue_invoice {
            let invoice = self.invoice_order(&latest).await?;
            latest = self.orders.require(order_id).await?;
            info!(order_id = %order_id, invoice = %invoice.number(), "invoice issued on delivery");
        }
        Ok(latest)
    }

    /// Flip the order's reservation flag, then restock its lines.
    ///
    /// The flag flip is atomic, so concurrent callers restock at most once.
    /// Returns the updated order if stock was released.
    async fn release_order_stock(&self, order_id: OrderId) -> WorkflowResult<Option<Order>> {
        let (order, released) = self
            .orders
            .update(order_id, |o| Ok(o.release_stock()))
            .await?;
        if !released {
            return Ok(None);
        }

        let lines: Vec<_> = order
            .lines()
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        self.restock(&lines).await;
        info!(order_id = %order_id, lines = lines.len(), "reserved stock released");
        Ok(Some(order))
    }

    async fn settle_invoice(&self, invoice_id: InvoiceId) -> WorkflowResult<()> {
        let result = self
            .invoices
            .update(invoice_id, |inv| match inv.status() {
                InvoiceStatus::Unpaid => inv.mark_paid(Utc::now()),
                _ => Ok(()),
            })
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound { .. }) => {
                warn!(invoice_id = %invoice_id, "order references a missing invoice");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Void an invoice unless it is already paid or void. Returns whether it was voided.
    ///
    /// A paid, void or missing invoice is left alone; store failures propagate.
    async fn void_if_unpaid(&self, invoice_id: InvoiceId, reason: &str) -> WorkflowResult<bool> {
        let reason = reason.to_string();
        let result = self
            .invoices
            .update(invoice_id, move |inv| {
                if inv.status() != InvoiceStatus::Unpaid {
                    return Err(DomainError::conflict("invoice is not open"));
                }
                inv.void(Some(reason), Utc::now())
            })
            .await;
        match result {
            Ok(_) => {
                info!(invoice_id = %invoice_id, "invoice voided");
                Ok(true)
            }
            Err(StoreError::Rejected(DomainError::Conflict(message))) => {
                info!(invoice_id = %invoice_id, reason = %message, "invoice left as is");
                Ok(false)
            }
            Err(StoreError::NotFound { .. }) => {
                warn!(invoice_id = %invoice_id, "order references a missing invoice");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}
