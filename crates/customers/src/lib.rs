//! Customers domain module.
//!
//! Customer records hold contact and shipping details. A customer may be
//! linked to a login account (`User`) or exist on its own (created by staff).

pub mod customer;

pub use customer::{Address, Customer, CustomerPatch, NewCustomer};
