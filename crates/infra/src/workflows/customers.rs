use chrono::Utc;
use tracing::{info, instrument};

use shopdesk_core::{CustomerId, Document, DomainError, UserId};
use shopdesk_customers::{Customer, CustomerPatch, NewCustomer};
use shopdesk_sales::Order;

use super::{Shop, WorkflowResult};
use crate::store::StoreError;

impl Shop {
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_customer(&self, input: NewCustomer) -> WorkflowResult<Customer> {
        let customer = Customer::create(input, Utc::now())?;
        self.customers.insert(&customer).await?;
        info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_customer(&self, customer_id: CustomerId, patch: CustomerPatch) -> WorkflowResult<Customer> {
        let (customer, ()) = self.customers.update(customer_id, |c| c.apply(patch)).await?;
        Ok(customer)
    }

    /// Shopper edits their own profile. Email and notes stay admin-only.
    #[instrument(skip(self, patch))]
    pub async fn update_own_profile(&self, user_id: UserId, patch: CustomerPatch) -> WorkflowResult<Customer> {
        let customer = self
            .customer_for_user(user_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        self.update_customer(customer.id, patch.self_service()).await
    }

    /// Remove a customer that never ordered anything.
    #[instrument(skip(self))]
    pub async fn delete_customer(&self, customer_id: CustomerId) -> WorkflowResult<()> {
        let customer = self.customers.require(customer_id).await?;
        let orders = self.orders_for_customer(customer_id).await?;
        if !orders.is_empty() {
            return Err(DomainError::conflict(format!(
                "customer {} has {} order(s) and cannot be deleted",
                customer.email,
                orders.len()
            ))
            .into());
        }

        if !self.customers.delete(customer_id).await? {
            return Err(StoreError::not_found(Customer::COLLECTION, customer_id.into()).into());
        }
        info!(customer_id = %customer_id, "customer deleted");
        Ok(())
    }

    /// Orders placed by a customer, newest first.
    pub async fn orders_for_customer(&self, customer_id: CustomerId) -> WorkflowResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .list()
            .await?
            .into_iter()
            .filter(|o| o.customer_id() == customer_id)
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }
}
