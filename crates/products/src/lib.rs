//! Products domain module.
//!
//! This crate contains business rules for the catalog and stock levels,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod product;

pub use catalog::{CatalogQuery, CatalogSort, categories};
pub use product::{NewProduct, Product, ProductPatch, ProductStatus};
