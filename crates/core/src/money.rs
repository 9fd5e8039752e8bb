//! Money helpers.
//!
//! Amounts are `u64` in the smallest currency unit (e.g. cents). Rates are
//! expressed in basis points (1 bp = 0.01%).

use crate::error::{DomainError, DomainResult};

/// One hundred percent, in basis points.
pub const FULL_RATE_BPS: u32 = 10_000;

/// `quantity × unit_price`, rejecting overflow.
pub fn line_total(quantity: u32, unit_price: u64) -> DomainResult<u64> {
    unit_price
        .checked_mul(u64::from(quantity))
        .ok_or_else(|| DomainError::validation("line total overflows"))
}

/// Sum of amounts, rejecting overflow.
pub fn checked_sum(amounts: impl IntoIterator<Item = u64>) -> DomainResult<u64> {
    amounts.into_iter().try_fold(0u64, |acc, a| {
        acc.checked_add(a)
            .ok_or_else(|| DomainError::validation("amount overflows"))
    })
}

/// Apply a basis-point rate to an amount, rounding half up.
pub fn apply_rate_bps(amount: u64, rate_bps: u32) -> u64 {
    let full = u128::from(FULL_RATE_BPS);
    let scaled = u128::from(amount) * u128::from(rate_bps);
    let rounded = (scaled + full / 2) / full;
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Render an amount as `"12.34 USD"`.
pub fn format_amount(amount: u64, currency: &str) -> String {
    format!("{}.{:02} {}", amount / 100, amount % 100, currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rate_rounds_half_up() {
        // 8.25% of 1.00 = 0.0825 -> 0.08
        assert_eq!(apply_rate_bps(100, 825), 8);
        // 5% of 0.10 = 0.005 -> 0.01
        assert_eq!(apply_rate_bps(10, 500), 1);
        assert_eq!(apply_rate_bps(0, 825), 0);
        assert_eq!(apply_rate_bps(1234, 0), 0);
    }

    #[test]
    fn line_total_detects_overflow() {
        assert_eq!(line_total(3, 250).unwrap(), 750);
        assert!(line_total(2, u64::MAX).is_err());
    }

    #[test]
    fn format_pads_cents() {
        assert_eq!(format_amount(1205, "USD"), "12.05 USD");
        assert_eq!(format_amount(7, "EUR"), "0.07 EUR");
    }

    proptest! {
        /// Property: a full rate is the identity and the result never exceeds it.
        #[test]
        fn rate_is_bounded_by_amount(amount in 0u64..1_000_000_000u64, bps in 0u32..=10_000u32) {
            let taxed = apply_rate_bps(amount, bps);
            prop_assert!(taxed <= amount);
            prop_assert_eq!(apply_rate_bps(amount, FULL_RATE_BPS), amount);
        }
    }
}
