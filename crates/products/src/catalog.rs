//! Catalog browsing: filter + sort over loaded products.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::{Product, ProductStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Storefront/back-office product filter.
///
/// All criteria are optional and combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub category: Option<String>,
    /// Case-insensitive substring match on name, SKU and description.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub min_price: Option<u64>,
    #[serde(default)]
    pub max_price: Option<u64>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub sort: Option<CatalogSort>,
}

impl CatalogQuery {
    /// Restrict the query to what shoppers may see.
    pub fn storefront(mut self) -> Self {
        self.status = Some(ProductStatus::Active);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(status) = self.status {
            if product.status() != status {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            let same = product
                .category()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        if let Some(needle) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = product.name().to_lowercase().contains(&needle)
                || product.sku().to_lowercase().contains(&needle)
                || product
                    .description()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price() < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price() > max) {
            return false;
        }
        match self.in_stock {
            Some(true) if product.stock() <= 0 => return false,
            Some(false) if product.stock() > 0 => return false,
            _ => {}
        }
        true
    }

    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let mut out: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();

        match self.sort.unwrap_or_default() {
            CatalogSort::Newest => out.sort_by(|a, b| b.created_at().cmp(&a.created_at())),
            CatalogSort::PriceAsc => out.sort_by(|a, b| a.price().cmp(&b.price()).then_with(|| a.name().cmp(b.name()))),
            CatalogSort::PriceDesc => out.sort_by(|a, b| b.price().cmp(&a.price()).then_with(|| a.name().cmp(b.name()))),
            CatalogSort::Name => out.sort_by_key(|p| p.name().to_lowercase()),
        }
        out
    }
}

/// Distinct categories of active products, sorted.
pub fn categories<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<String> {
    products
        .into_iter()
        .filter(|p| p.is_purchasable())
        .filter_map(|p| p.category())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
