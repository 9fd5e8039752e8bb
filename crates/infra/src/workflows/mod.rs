//! Multi-document workflows.
//!
//! The store only guarantees atomicity per document. Operations touching
//! several documents (checkout, cancellation, signup) run step by step and
//! undo completed steps by hand when a later one fails.

mod accounts;
mod catalog;
mod checkout;
mod customers;
mod fulfilment;
mod invoicing;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use shopdesk_auth::{PasswordError, User};
use shopdesk_core::{DomainError, ProductId, SettingsId};
use shopdesk_customers::Customer;
use shopdesk_invoicing::Invoice;
use shopdesk_products::Product;
use shopdesk_sales::Order;
use shopdesk_settings::StoreSettings;

use crate::store::{Collection, DocumentStore, StoreError};

pub use accounts::SignupRequest;
pub use checkout::{CartLine, CartQuote, CheckoutRequest, QuoteLine, merge_lines};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is suspended")]
    Suspended,
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Rejected(err) => WorkflowError::Domain(err),
            other => WorkflowError::Store(other),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Typed collections plus the workflows that span them.
#[derive(Clone, Debug)]
pub struct Shop {
    pub users: Collection<User>,
    pub customers: Collection<Customer>,
    pub products: Collection<Product>,
    pub orders: Collection<Order>,
    pub invoices: Collection<Invoice>,
    pub settings: Collection<StoreSettings>,
}

impl Shop {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Collection::new(Arc::clone(&store)),
            customers: Collection::new(Arc::clone(&store)),
            products: Collection::new(Arc::clone(&store)),
            orders: Collection::new(Arc::clone(&store)),
            invoices: Collection::new(Arc::clone(&store)),
            settings: Collection::new(store),
        }
    }

    /// Current settings, creating the defaults on first use.
    pub async fn store_settings(&self) -> WorkflowResult<StoreSettings> {
        if let Some(settings) = self.settings.get(SettingsId::singleton()).await? {
            return Ok(settings);
        }

        let defaults = StoreSettings::default_for(Utc::now());
        match self.settings.insert(&defaults).await {
            Ok(()) => {
                info!("initialized default store settings");
                Ok(defaults)
            }
            // Lost the race against a concurrent first request.
            Err(StoreError::Duplicate { .. }) => Ok(self.settings.require(SettingsId::singleton()).await?),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_settings(&self, patch: shopdesk_settings::SettingsPatch) -> WorkflowResult<StoreSettings> {
        self.store_settings().await?;
        let (settings, ()) = self
            .settings
            .update(SettingsId::singleton(), |s| s.apply(patch))
            .await?;
        info!(currency = %settings.currency, tax_rate_bps = settings.tax_rate_bps, "store settings updated");
        Ok(settings)
    }

    pub(crate) async fn claim_order_number(&self) -> WorkflowResult<String> {
        self.store_settings().await?;
        let (_, number) = self
            .settings
            .update(SettingsId::singleton(), |s| s.claim_order_number())
            .await?;
        Ok(number)
    }

    pub(crate) async fn claim_invoice_number(&self) -> WorkflowResult<String> {
        self.store_settings().await?;
        let (_, number) = self
            .settings
            .update(SettingsId::singleton(), |s| s.claim_invoice_number())
            .await?;
        Ok(number)
    }

    /// Return reserved units to the catalog, best effort.
    ///
    /// Used as a compensating action; a line that cannot be restocked (e.g.
    /// the product was deleted meanwhile) is logged and skipped.
    pub(crate) async fn restock(&self, lines: &[(ProductId, u32)]) {
        for &(product_id, quantity) in lines {
            if let Err(err) = self
                .products
                .update(product_id, |p| p.restock(quantity))
                .await
            {
                warn!(product_id = %product_id, quantity, error = %err, "failed to restock product");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_shop;
    use super::*;

    #[tokio::test]
    async fn settings_are_created_once() {
        let shop = test_shop();
        let first = shop.store_settings().await.unwrap();
        let second = shop.store_settings().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn numbers_are_sequential() {
        let shop = test_shop();
        assert_eq!(shop.claim_order_number().await.unwrap(), "ORD-000001");
        assert_eq!(shop.claim_order_number().await.unwrap(), "ORD-000002");
        assert_eq!(shop.claim_invoice_number().await.unwrap(), "INV-000001");
    }

    #[tokio::test]
    async fn rejected_store_update_becomes_domain_error() {
        let err: WorkflowError = StoreError::Rejected(DomainError::conflict("x")).into();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Conflict(_))));
    }
}
