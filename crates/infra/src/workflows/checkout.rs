use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use shopdesk_core::money::line_total;
use shopdesk_core::{CustomerId, Document, DomainError, DomainResult, ProductId};
use shopdesk_customers::Address;
use shopdesk_sales::{NewOrder, Order, OrderLine, PaymentMethod, Totals, price_lines};

use super::{Shop, WorkflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    /// Falls back to the customer's saved address.
    pub shipping_address: Option<Address>,
    pub notes: Option<String>,
}

/// Merge repeated products into one line, keeping first-seen order.
pub fn merge_lines(lines: &[CartLine]) -> DomainResult<Vec<CartLine>> {
    if lines.is_empty() {
        return Err(DomainError::validation("cart is empty"));
    }
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflows"))?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Priced cart line; `problem` is set when the line cannot be ordered as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
    pub available: i64,
    pub problem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartQuote {
    pub lines: Vec<QuoteLine>,
    pub totals: Totals,
    pub currency: String,
    /// True when every line can be ordered right now.
    pub orderable: bool,
}

impl Shop {
    /// Checkout: reserve stock line by line, then record the order.
    ///
    /// Each reservation is an atomic conditional decrement on the product.
    /// Any failure returns every unit reserved so far.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, lines = request.lines.len()))]
    pub async fn place_order(&self, request: CheckoutRequest) -> WorkflowResult<Order> {
        let lines = merge_lines(&request.lines)?;
        let customer = self.customers.require(request.customer_id).await?;

        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
        let mut order_lines: Vec<OrderLine> = Vec::with_capacity(lines.len());

        for line in &lines {
            let quantity = line.quantity;
            let taken = self
                .products
                .update(line.product_id, move |p| {
                    if !p.is_purchasable() {
                        return Err(DomainError::invariant(format!(
                            "{} is not available for purchase",
                            p.sku()
                        )));
                    }
                    p.take_stock(quantity)?;
                    Ok(OrderLine {
                        product_id: p.id(),
                        sku: p.sku().to_string(),
                        name: p.name().to_string(),
                        quantity,
                        unit_price: p.price(),
                    })
                })
                .await;

            match taken {
                Ok((_, order_line)) => {
                    reserved.push((line.product_id, quantity));
                    order_lines.push(order_line);
                }
                Err(err) => {
                    if !reserved.is_empty() {
                        warn!(error = %err, reserved = reserved.len(), "checkout failed; releasing reserved stock");
                        self.restock(&reserved).await;
                    }
                    return Err(err.into());
                }
            }
        }

        let shipping_address = request.shipping_address.or(customer.address);
        let recorded = self
            .record_order(request.customer_id, order_lines, request.payment_method, shipping_address, request.notes)
            .await;

        match recorded {
            Ok(order) => {
                info!(order_id = %order.id(), number = %order.number(), total = order.totals().total, "order placed");
                Ok(order)
            }
            Err(err) => {
                warn!(error = %err, "order write failed; releasing reserved stock");
                self.restock(&reserved).await;
                Err(err)
            }
        }
    }

    async fn record_order(
        &self,
        customer_id: CustomerId,
        lines: Vec<OrderLine>,
        payment_method: PaymentMethod,
        shipping_address: Option<Address>,
        notes: Option<String>,
    ) -> WorkflowResult<Order> {
        let policy = self.store_settings().await?.pricing_policy();
        let number = self.claim_order_number().await?;
        let order = Order::place(
            NewOrder {
                number,
                customer_id,
                lines,
                payment_method,
                shipping_address,
                notes,
            },
            &policy,
            Utc::now(),
        )?;
        self.orders.insert(&order).await?;
        Ok(order)
    }

    /// Price a cart against the live catalog without reserving anything.
    pub async fn quote_cart(&self, lines: &[CartLine]) -> WorkflowResult<CartQuote> {
        let lines = merge_lines(lines)?;
        let settings = self.store_settings().await?;

        let mut quoted = Vec::with_capacity(lines.len());
        let mut priced = Vec::with_capacity(lines.len());
        for line in &lines {
            let Some(product) = self.products.get(line.product_id).await? else {
                quoted.push(QuoteLine {
                    product_id: line.product_id,
                    sku: None,
                    name: None,
                    quantity: line.quantity,
                    unit_price: 0,
                    line_total: 0,
                    available: 0,
                    problem: Some("product not found".to_string()),
                });
                continue;
            };

            let problem = if !product.is_purchasable() {
                Some("product is not available for purchase".to_string())
            } else if product.stock() < i64::from(line.quantity) {
                Some(format!("only {} in stock", product.stock().max(0)))
            } else {
                None
            };

            let order_line = OrderLine {
                product_id: line.product_id,
                sku: product.sku().to_string(),
                name: product.name().to_string(),
                quantity: line.quantity,
                unit_price: product.price(),
            };
            quoted.push(QuoteLine {
                product_id: line.product_id,
                sku: Some(order_line.sku.clone()),
                name: Some(order_line.name.clone()),
                quantity: line.quantity,
                unit_price: product.price(),
                line_total: line_total(line.quantity, product.price())?,
                available: product.stock(),
                problem: problem.clone(),
            });
            if problem.is_none() {
                priced.push(order_line);
            }
        }

        let totals = price_lines(&priced, &settings.pricing_policy())?;
        Ok(CartQuote {
            orderable: quoted.iter().all(|l| l.problem.is_none()),
            lines: quoted,
            totals,
            currency: settings.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::WorkflowError;
    use crate::workflows::test_support::{seed_customer, seed_product, stock_of, test_shop};
    use shopdesk_products::{ProductPatch, ProductStatus};
    use shopdesk_sales::OrderStatus;

    fn cart(lines: &[(ProductId, u32)]) -> Vec<CartLine> {
        lines
            .iter()
            .map(|&(product_id, quantity)| CartLine { product_id, quantity })
            .collect()
    }

    fn checkout(customer_id: CustomerId, lines: Vec<CartLine>) -> CheckoutRequest {
        CheckoutRequest {
            customer_id,
            lines,
            payment_method: PaymentMethod::Card,
            shipping_address: None,
            notes: None,
        }
    }

    #[test]
    fn merge_lines_sums_duplicates() {
        let a = ProductId::new();
        let b = ProductId::new();
        let merged = merge_lines(&cart(&[(a, 1), (b, 2), (a, 3)])).unwrap();
        assert_eq!(merged, cart(&[(a, 4), (b, 2)]));

        assert!(merge_lines(&[]).is_err());
        assert!(merge_lines(&cart(&[(a, 0)])).is_err());
    }

    #[tokio::test]
    async fn checkout_reserves_stock_and_numbers_order() {
        let shop = test_shop();
        let customer = seed_customer(&shop, "c@example.com").await;
        let mug = seed_product(&shop, "MUG", 1_000, 5).await;

        let order = shop
            .place_order(checkout(customer, cart(&[(mug.id(), 2), (mug.id(), 1)])))
            .await
            .unwrap();

        assert_eq!(order.number(), "ORD-000001");
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.lines().len(), 1);
        assert_eq!(order.lines()[0].quantity, 3);
        assert_eq!(order.totals().subtotal, 3_000);
        assert!(order.stock_reserved());
        assert_eq!(stock_of(&shop, &mug).await, 2);
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_earlier_lines() {
        let shop = test_shop();
        let customer = seed_customer(&shop, "c@example.com").await;
        let mug = seed_product(&shop, "MUG", 1_000, 5).await;
        let pot = seed_product(&shop, "POT", 3_000, 1).await;

        let err = shop
            .place_order(checkout(customer, cart(&[(mug.id(), 2), (pot.id(), 2)])))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Domain(DomainError::InvariantViolation(ref m)) if m.contains("POT")));
        assert_eq!(stock_of(&shop, &mug).await, 5);
        assert_eq!(stock_of(&shop, &pot).await, 1);
        assert!(shop.orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unpurchasable_product_is_rejected() {
        let shop = test_shop();
        let customer = seed_customer(&shop, "c@example.com").await;
        let mug = seed_product(&shop, "MUG", 1_000, 5).await;
        shop.products
            .update(mug.id(), |p| {
                p.apply(ProductPatch {
                    status: Some(ProductStatus::Archived),
                    ..ProductPatch::default()
                })
            })
            .await
            .unwrap();

        let err = shop
            .place_order(checkout(customer, cart(&[(mug.id(), 1)])))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(stock_of(&shop, &mug).await, 5);
    }

    #[tokio::test]
    async fn unknown_product_restores_reserved_lines() {
        let shop = test_shop();
        let customer = seed_customer(&shop, "c@example.com").await;
        let mug = seed_product(&shop, "MUG", 1_000, 5).await;

        let err = shop
            .place_order(checkout(customer, cart(&[(mug.id(), 4), (ProductId::new(), 1)])))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Store(crate::store::StoreError::NotFound { .. })));
        assert_eq!(stock_of(&shop, &mug).await, 5);
    }

    #[tokio::test]
    async fn unknown_customer_reserves_nothing() {
        let shop = test_shop();
        let mug = seed_product(&shop, "MUG", 1_000, 5).await;
        assert!(shop
            .place_order(checkout(CustomerId::new(), cart(&[(mug.id(), 1)])))
            .await
            .is_err());
        assert_eq!(stock_of(&shop, &mug).await, 5);
    }

    #[tokio::test]
    async fn quote_reports_problems_without_reserving() {
        let shop = test_shop();
        let mug = seed_product(&shop, "MUG", 1_000, 5).await;
        let pot = seed_product(&shop, "POT", 3_000, 1).await;
        let missing = ProductId::new();

        let quote = shop
            .quote_cart(&cart(&[(mug.id(), 2), (pot.id(), 3), (missing, 1)]))
            .await
            .unwrap();

        assert!(!quote.orderable);
        assert_eq!(quote.totals.subtotal, 2_000);
        assert_eq!(quote.lines[1].problem.as_deref(), Some("only 1 in stock"));
        assert_eq!(quote.lines[2].problem.as_deref(), Some("product not found"));
        assert_eq!(quote.currency, "USD");
        assert_eq!(stock_of(&shop, &mug).await, 5);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: stock never goes negative and is conserved: units
            /// held by placed orders plus units on hand equal the initial stock.
            #[test]
            fn checkouts_conserve_stock(
                initial in 0i64..20,
                requests in proptest::collection::vec(1u32..8, 1..12)
            ) {
                let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
                rt.block_on(async {
                    let shop = test_shop();
                    let customer = seed_customer(&shop, "p@example.com").await;
                    let mug = seed_product(&shop, "MUG", 100, initial).await;

                    let mut sold = 0i64;
                    for quantity in requests {
                        if let Ok(order) = shop.place_order(checkout(customer, cart(&[(mug.id(), quantity)]))).await {
                            sold += i64::from(order.lines()[0].quantity);
                        }
                        let stock = stock_of(&shop, &mug).await;
                        assert!(stock >= 0);
                        assert_eq!(stock + sold, initial);
                    }
                });
            }
        }
    }
}
