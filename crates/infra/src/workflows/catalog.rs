use chrono::Utc;
use tracing::{info, instrument};

use shopdesk_core::{Document, ProductId};
use shopdesk_products::{NewProduct, Product, ProductPatch};

use super::{Shop, WorkflowResult};
use crate::store::StoreError;

impl Shop {
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(&self, input: NewProduct) -> WorkflowResult<Product> {
        let product = Product::create(input, Utc::now())?;
        self.products.insert(&product).await?;
        info!(product_id = %product.id(), sku = %product.sku(), "product created");
        Ok(product)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_product(&self, product_id: ProductId, patch: ProductPatch) -> WorkflowResult<Product> {
        let (product, ()) = self.products.update(product_id, |p| p.apply(patch)).await?;
        Ok(product)
    }

    /// Add or remove units by `delta`. Rejected when stock would drop below zero.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, product_id: ProductId, delta: i64) -> WorkflowResult<Product> {
        let (product, ()) = self
            .products
            .update(product_id, move |p| p.adjust_stock(delta))
            .await?;
        info!(product_id = %product_id, delta, stock = product.stock(), "stock adjusted");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: ProductId) -> WorkflowResult<()> {
        if !self.products.delete(product_id).await? {
            return Err(StoreError::not_found(Product::COLLECTION, product_id.into()).into());
        }
        info!(product_id = %product_id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shopdesk_core::DomainError;
    use shopdesk_products::ProductStatus;

    use super::*;
    use crate::workflows::WorkflowError;
    use crate::workflows::test_support::{seed_product, stock_of, test_shop};

    fn new_product(sku: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: "Desk lamp".to_string(),
            description: None,
            category: Some("Lighting".to_string()),
            price: 3_500,
            compare_at_price: None,
            stock: 4,
            image_url: None,
            status: ProductStatus::Active,
        }
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected() {
        let shop = test_shop();
        shop.create_product(new_product("lamp-1")).await.unwrap();

        let err = shop.create_product(new_product("LAMP-1")).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Store(StoreError::Duplicate { ref key, .. }) if key == "sku"
        ));
    }

    #[tokio::test]
    async fn stock_adjustments_never_go_negative() {
        let shop = test_shop();
        let lamp = seed_product(&shop, "LAMP", 3_500, 3).await;

        shop.adjust_stock(lamp.id(), 2).await.unwrap();
        let err = shop.adjust_stock(lamp.id(), -6).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(stock_of(&shop, &lamp).await, 5);

        shop.adjust_stock(lamp.id(), -5).await.unwrap();
        assert_eq!(stock_of(&shop, &lamp).await, 0);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let shop = test_shop();
        let lamp = seed_product(&shop, "LAMP", 3_500, 3).await;

        let updated = shop
            .update_product(
                lamp.id(),
                ProductPatch {
                    price: Some(3_000),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price(), 3_000);

        shop.delete_product(lamp.id()).await.unwrap();
        let err = shop.delete_product(lamp.id()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::NotFound { .. })));
    }
}
