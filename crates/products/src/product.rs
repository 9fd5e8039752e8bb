use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::error::{optional_text, require_text};
use shopdesk_core::patch::nullable;
use shopdesk_core::{Document, DomainError, DomainResult, ProductId};

const MAX_SKU_LENGTH: usize = 64;

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    #[default]
    Active,
    Archived,
}

/// Input for [`Product::create`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    #[serde(default)]
    pub compare_at_price: Option<u64>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
}

/// Partial update. Absent fields are left untouched; `null` clears optional ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub compare_at_price: Option<Option<u64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

/// A sellable catalog entry together with its on-hand stock.
///
/// # Invariants
/// - SKU is non-empty, upper-cased and unique (store `sku` key).
/// - `price > 0`; `compare_at_price`, when set, exceeds `price`.
/// - `stock >= 0` after every operation.
/// - Only `active` products can be purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    price: u64,
    compare_at_price: Option<u64>,
    stock: i64,
    image_url: Option<String>,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }

        let product = Self {
            id: ProductId::new(),
            sku: normalize_sku(&input.sku)?,
            name: require_text("name", &input.name)?,
            description: optional_text(input.description),
            category: optional_text(input.category),
            price: input.price,
            compare_at_price: input.compare_at_price,
            stock: input.stock,
            image_url: optional_text(input.image_url),
            status: input.status,
            created_at: now,
            updated_at: now,
        };
        product.ensure_pricing()?;
        Ok(product)
    }

    /// Apply a partial update. On error `self` is left unchanged.
    pub fn apply(&mut self, patch: ProductPatch) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(sku) = patch.sku {
            next.sku = normalize_sku(&sku)?;
        }
        if let Some(name) = patch.name {
            next.name = require_text("name", &name)?;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(description);
        }
        if let Some(category) = patch.category {
            next.category = optional_text(category);
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(compare_at_price) = patch.compare_at_price {
            next.compare_at_price = compare_at_price;
        }
        if let Some(image_url) = patch.image_url {
            next.image_url = optional_text(image_url);
        }
        if let Some(status) = patch.status {
            next.status = status;
        }

        next.ensure_pricing()?;
        *self = next;
        Ok(())
    }

    /// Remove `qty` units from stock.
    pub fn take_stock(&mut self, qty: u32) -> DomainResult<()> {
        if qty == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let remaining = self.stock - i64::from(qty);
        if remaining < 0 {
            return Err(DomainError::invariant(format!(
                "stock cannot go negative: {} has {} in stock, {} requested",
                self.sku, self.stock, qty
            )));
        }
        self.stock = remaining;
        Ok(())
    }

    /// Return `qty` units to stock.
    pub fn restock(&mut self, qty: u32) -> DomainResult<()> {
        self.stock = self
            .stock
            .checked_add(i64::from(qty))
            .ok_or_else(|| DomainError::validation("stock overflow"))?;
        Ok(())
    }

    /// Manual correction by a signed delta.
    pub fn adjust_stock(&mut self, delta: i64) -> DomainResult<()> {
        let next = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock overflow"))?;
        if next < 0 {
            return Err(DomainError::invariant(format!(
                "stock cannot go negative: {} has {} in stock, adjustment {}",
                self.sku, self.stock, delta
            )));
        }
        self.stock = next;
        Ok(())
    }

    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock <= threshold
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn compare_at_price(&self) -> Option<u64> {
        self.compare_at_price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn ensure_pricing(&self) -> DomainResult<()> {
        if self.price == 0 {
            return Err(DomainError::validation("price must be greater than zero"));
        }
        if let Some(compare_at) = self.compare_at_price {
            if compare_at <= self.price {
                return Err(DomainError::validation(
                    "compare_at_price must be greater than price",
                ));
            }
        }
        Ok(())
    }
}

impl Document for Product {
    const COLLECTION: &'static str = "products";
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("sku", self.sku.clone())]
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

fn normalize_sku(raw: &str) -> DomainResult<String> {
    let sku = require_text("sku", raw)?.to_uppercase();
    if sku.len() > MAX_SKU_LENGTH {
        return Err(DomainError::validation(format!(
            "sku must be at most {MAX_SKU_LENGTH} characters"
        )));
    }
    if sku.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("sku cannot contain whitespace"));
    }
    Ok(sku)
}
