//! Sales domain module.
//!
//! Orders, their status lifecycle and pricing. Pure domain logic: the
//! side effects a transition calls for (stock release, invoicing) are
//! reported back to the caller as [`TransitionEffects`].

pub mod order;
pub mod pricing;
pub mod status;

pub use order::{NewOrder, Order, OrderLine, StatusChange, TransitionEffects};
pub use pricing::{PricingPolicy, Totals, price_lines};
pub use status::{OrderStatus, PaymentMethod, PaymentStatus};
