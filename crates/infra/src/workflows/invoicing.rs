use chrono::Utc;
use tracing::{info, instrument, warn};

use shopdesk_core::{Document, DomainError, InvoiceId, OrderId};
use shopdesk_invoicing::Invoice;
use shopdesk_sales::{Order, PaymentStatus};

use super::{Shop, WorkflowError, WorkflowResult};
use crate::store::StoreError;

impl Shop {
    /// Manually invoice an order. Fails if the order already has an open invoice.
    #[instrument(skip(self))]
    pub async fn issue_invoice(&self, order_id: OrderId) -> WorkflowResult<Invoice> {
        let order = self.orders.require(order_id).await?;
        let existing = self
            .invoices
            .find_one_by("order_id", &order_id.to_string())
            .await?;
        if order.invoice_id().is_some() || existing.is_some() {
            return Err(DomainError::conflict(format!(
                "order {} already has an invoice",
                order.number()
            ))
            .into());
        }

        let invoice = self.create_invoice(&order).await?;
        info!(order_id = %order_id, invoice = %invoice.number(), "invoice issued");
        Ok(invoice)
    }

    /// Invoice for `order`, creating it only if none exists yet.
    pub(crate) async fn invoice_order(&self, order: &Order) -> WorkflowResult<Invoice> {
        let order_key = order.id().to_string();
        if let Some(existing) = self.invoices.find_one_by("order_id", &order_key).await? {
            self.link_invoice(order.id(), existing.id()).await?;
            return Ok(existing);
        }

        match self.create_invoice(order).await {
            Err(WorkflowError::Store(StoreError::Duplicate { key, .. })) if key == "order_id" => {
                let existing = self
                    .invoices
                    .find_one_by("order_id", &order_key)
                    .await?
                    .ok_or_else(|| StoreError::not_found(Invoice::COLLECTION, order.id().into()))?;
                self.link_invoice(order.id(), existing.id()).await?;
                Ok(existing)
            }
            other => other,
        }
    }

    async fn create_invoice(&self, order: &Order) -> WorkflowResult<Invoice> {
        let due_days = self.store_settings().await?.invoice_due_days;
        let number = self.claim_invoice_number().await?;
        let invoice = Invoice::from_order(order, number, due_days, Utc::now())?;
        self.invoices.insert(&invoice).await?;
        self.link_invoice(order.id(), invoice.id()).await?;
        Ok(invoice)
    }

    async fn link_invoice(&self, order_id: OrderId, invoice_id: InvoiceId) -> WorkflowResult<()> {
        self.orders
            .update(order_id, move |o| o.link_invoice(invoice_id))
            .await?;
        Ok(())
    }

    /// Mark an invoice paid and carry the payment over to its order.
    #[instrument(skip(self))]
    pub async fn pay_invoice(&self, invoice_id: InvoiceId) -> WorkflowResult<Invoice> {
        let (invoice, ()) = self
            .invoices
            .update(invoice_id, |inv| inv.mark_paid(Utc::now()))
            .await?;

        let synced = self
            .orders
            .update(invoice.order_id(), |o| {
                if o.payment_status() == PaymentStatus::Unpaid {
                    o.set_payment_status(PaymentStatus::Paid)?;
                }
                Ok(())
            })
            .await;
        if let Err(err) = synced {
            warn!(order_id = %invoice.order_id(), error = %err, "order payment status not synced");
        }

        info!(invoice = %invoice.number(), "invoice paid");
        Ok(invoice)
    }

    /// Void an unpaid invoice and detach it from its order.
    #[instrument(skip(self))]
    pub async fn void_invoice(&self, invoice_id: InvoiceId, reason: Option<String>) -> WorkflowResult<Invoice> {
        let (invoice, ()) = self
            .invoices
            .update(invoice_id, move |inv| inv.void(reason, Utc::now()))
            .await?;

        let unlinked = self
            .orders
            .update(invoice.order_id(), move |o| {
                o.unlink_invoice(invoice_id);
                Ok(())
            })
            .await;
        match unlinked {
            Ok(_) | Err(StoreError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        info!(invoice = %invoice.number(), "invoice voided");
        Ok(invoice)
    }
}
