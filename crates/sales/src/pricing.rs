//! Order pricing: subtotal, tax, shipping.

use serde::{Deserialize, Serialize};

use shopdesk_core::money::{apply_rate_bps, checked_sum, line_total};
use shopdesk_core::{DomainError, DomainResult};

use crate::OrderLine;

/// Store-wide pricing rules, taken from settings at checkout time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PricingPolicy {
    /// Tax rate in basis points (1 bps = 0.01%).
    pub tax_rate_bps: u32,
    /// Flat shipping fee per order.
    pub shipping_fee: u64,
    /// Orders at or above this subtotal ship free.
    pub free_shipping_threshold: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Totals {
    pub subtotal: u64,
    pub tax: u64,
    pub shipping: u64,
    pub total: u64,
}

impl PricingPolicy {
    pub fn shipping_for(&self, subtotal: u64, empty: bool) -> u64 {
        if empty {
            return 0;
        }
        match self.free_shipping_threshold {
            Some(threshold) if subtotal >= threshold => 0,
            _ => self.shipping_fee,
        }
    }
}

/// Price a set of lines under `policy`.
///
/// Tax is computed on the subtotal only and rounded half-up.
pub fn price_lines(lines: &[OrderLine], policy: &PricingPolicy) -> DomainResult<Totals> {
    let amounts = lines
        .iter()
        .map(|l| line_total(l.quantity, l.unit_price))
        .collect::<DomainResult<Vec<_>>>()?;
    let subtotal = checked_sum(amounts)?;
    let tax = apply_rate_bps(subtotal, policy.tax_rate_bps);
    let shipping = policy.shipping_for(subtotal, lines.is_empty());
    let total = subtotal
        .checked_add(tax)
        .and_then(|t| t.checked_add(shipping))
        .ok_or_else(|| DomainError::validation("order total overflows"))?;

    Ok(Totals {
        subtotal,
        tax,
        shipping,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopdesk_core::ProductId;

    fn line(quantity: u32, unit_price: u64) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(),
            sku: "SKU".to_string(),
            name: "Item".to_string(),
            quantity,
            unit_price,
        }
    }

    fn policy() -> PricingPolicy {
        PricingPolicy {
            tax_rate_bps: 825,
            shipping_fee: 500,
            free_shipping_threshold: Some(5_000),
        }
    }

    #[test]
    fn prices_with_tax_and_shipping() {
        let totals = price_lines(&[line(2, 1_000), line(1, 999)], &policy()).unwrap();
        // 2999 * 8.25% = 247.4175 -> 247
        assert_eq!(
            totals,
            Totals {
                subtotal: 2_999,
                tax: 247,
                shipping: 500,
                total: 3_746,
            }
        );
    }

    #[test]
    fn tax_rounds_half_up() {
        let policy = PricingPolicy {
            tax_rate_bps: 500,
            ..PricingPolicy::default()
        };
        // 10 * 5% = 0.5 -> 1
        assert_eq!(price_lines(&[line(1, 10)], &policy).unwrap().tax, 1);
    }

    #[test]
    fn free_shipping_at_threshold_and_for_empty_cart() {
        let totals = price_lines(&[line(5, 1_000)], &policy()).unwrap();
        assert_eq!(totals.shipping, 0);

        let empty = price_lines(&[], &policy()).unwrap();
        assert_eq!(empty, Totals::default());
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let err = price_lines(&[line(u32::MAX, u64::MAX)], &policy()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: total is always subtotal + tax + shipping, and the
            /// subtotal equals the sum of line totals.
            #[test]
            fn totals_add_up(
                lines in proptest::collection::vec((1u32..100, 1u64..100_000), 0..10),
                tax_rate_bps in 0u32..=10_000,
                shipping_fee in 0u64..2_000,
                threshold in proptest::option::of(0u64..1_000_000),
            ) {
                let lines: Vec<OrderLine> = lines.into_iter().map(|(q, p)| line(q, p)).collect();
                let policy = PricingPolicy { tax_rate_bps, shipping_fee, free_shipping_threshold: threshold };
                let totals = price_lines(&lines, &policy).unwrap();

                let expected: u64 = lines.iter().map(|l| u64::from(l.quantity) * l.unit_price).sum();
                prop_assert_eq!(totals.subtotal, expected);
                prop_assert_eq!(totals.total, totals.subtotal + totals.tax + totals.shipping);
                prop_assert!(totals.tax <= totals.subtotal);
            }
        }
    }
}
