//! Invoicing domain module.
//!
//! Invoices are issued from orders and carry a copy of the order's lines and
//! totals at issue time.

pub mod invoice;

pub use invoice::{Invoice, InvoiceStatus};
