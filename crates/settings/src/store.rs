use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::error::require_text;
use shopdesk_core::money::FULL_RATE_BPS;
use shopdesk_core::patch::nullable;
use shopdesk_core::{Document, DomainError, DomainResult, Email, SettingsId};
use shopdesk_sales::PricingPolicy;

const MAX_DUE_DAYS: u32 = 365;

/// `"ORD"`, 12 → `"ORD-000012"`.
pub fn format_number(prefix: &str, seq: u64) -> String {
    format!("{prefix}-{seq:06}")
}

/// Singleton settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub id: SettingsId,
    pub store_name: String,
    pub contact_email: Option<Email>,
    /// ISO-4217 code, upper case.
    pub currency: String,
    pub tax_rate_bps: u32,
    pub shipping_fee: u64,
    pub free_shipping_threshold: Option<u64>,
    pub low_stock_threshold: i64,
    pub invoice_due_days: u32,
    pub next_order_seq: u64,
    pub next_invoice_seq: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_email: Option<Option<Email>>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub tax_rate_bps: Option<u32>,
    #[serde(default)]
    pub shipping_fee: Option<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub free_shipping_threshold: Option<Option<u64>>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub invoice_due_days: Option<u32>,
}

impl StoreSettings {
    pub fn default_for(now: DateTime<Utc>) -> Self {
        Self {
            id: SettingsId::singleton(),
            store_name: "Shopdesk".to_string(),
            contact_email: None,
            currency: "USD".to_string(),
            tax_rate_bps: 0,
            shipping_fee: 0,
            free_shipping_threshold: None,
            low_stock_threshold: 5,
            invoice_due_days: 30,
            next_order_seq: 1,
            next_invoice_seq: 1,
            updated_at: now,
        }
    }

    /// Apply a partial update. Counters are not patchable. On error `self` is
    /// left unchanged.
    pub fn apply(&mut self, patch: SettingsPatch) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.store_name {
            next.store_name = require_text("store_name", &name)?;
        }
        if let Some(email) = patch.contact_email {
            next.contact_email = email;
        }
        if let Some(currency) = patch.currency {
            next.currency = normalize_currency(&currency)?;
        }
        if let Some(rate) = patch.tax_rate_bps {
            next.tax_rate_bps = rate;
        }
        if let Some(fee) = patch.shipping_fee {
            next.shipping_fee = fee;
        }
        if let Some(threshold) = patch.free_shipping_threshold {
            next.free_shipping_threshold = threshold;
        }
        if let Some(threshold) = patch.low_stock_threshold {
            next.low_stock_threshold = threshold;
        }
        if let Some(days) = patch.invoice_due_days {
            next.invoice_due_days = days;
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.tax_rate_bps > FULL_RATE_BPS {
            return Err(DomainError::validation(format!(
                "tax_rate_bps must be between 0 and {FULL_RATE_BPS}"
            )));
        }
        if !(1..=MAX_DUE_DAYS).contains(&self.invoice_due_days) {
            return Err(DomainError::validation(format!(
                "invoice_due_days must be between 1 and {MAX_DUE_DAYS}"
            )));
        }
        if self.low_stock_threshold < 0 {
            return Err(DomainError::validation("low_stock_threshold cannot be negative"));
        }
        Ok(())
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate_bps: self.tax_rate_bps,
            shipping_fee: self.shipping_fee,
            free_shipping_threshold: self.free_shipping_threshold,
        }
    }

    /// Take the next order number and advance the counter.
    pub fn claim_order_number(&mut self) -> DomainResult<String> {
        let seq = self.next_order_seq;
        self.next_order_seq = seq
            .checked_add(1)
            .ok_or_else(|| DomainError::invariant("order number sequence exhausted"))?;
        Ok(format_number("ORD", seq))
    }

    /// Take the next invoice number and advance the counter.
    pub fn claim_invoice_number(&mut self) -> DomainResult<String> {
        let seq = self.next_invoice_seq;
        self.next_invoice_seq = seq
            .checked_add(1)
            .ok_or_else(|| DomainError::invariant("invoice number sequence exhausted"))?;
        Ok(format_number("INV", seq))
    }
}

impl Document for StoreSettings {
    const COLLECTION: &'static str = "settings";
    type Id = SettingsId;

    fn id(&self) -> SettingsId {
        self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

fn normalize_currency(raw: &str) -> DomainResult<String> {
    let code = raw.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(DomainError::validation(format!(
            "currency must be a 3-letter ISO code, got '{}'",
            raw.trim()
        )));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_sequential_and_zero_padded() {
        let mut settings = StoreSettings::default_for(Utc::now());
        assert_eq!(settings.claim_order_number().unwrap(), "ORD-000001");
        assert_eq!(settings.claim_order_number().unwrap(), "ORD-000002");
        assert_eq!(settings.claim_invoice_number().unwrap(), "INV-000001");
        assert_eq!(settings.next_order_seq, 3);
    }

    #[test]
    fn patch_updates_pricing_policy() {
        let mut settings = StoreSettings::default_for(Utc::now());
        let patch: SettingsPatch = serde_json::from_str(
            r#"{"currency":" eur ","tax_rate_bps":2000,"shipping_fee":499,"free_shipping_threshold":5000}"#,
        )
        .unwrap();
        settings.apply(patch).unwrap();

        assert_eq!(settings.currency, "EUR");
        assert_eq!(
            settings.pricing_policy(),
            PricingPolicy {
                tax_rate_bps: 2_000,
                shipping_fee: 499,
                free_shipping_threshold: Some(5_000),
            }
        );
    }

    #[test]
    fn invalid_patch_is_rejected_atomically() {
        let mut settings = StoreSettings::default_for(Utc::now());
        let before = settings.clone();
        let patch = SettingsPatch {
            store_name: Some("Renamed".to_string()),
            tax_rate_bps: Some(10_001),
            ..SettingsPatch::default()
        };
        assert!(settings.apply(patch).is_err());
        assert_eq!(settings, before);

        let bad_currency = SettingsPatch {
            currency: Some("dollars".to_string()),
            ..SettingsPatch::default()
        };
        assert!(settings.apply(bad_currency).is_err());

        let bad_days = SettingsPatch {
            invoice_due_days: Some(0),
            ..SettingsPatch::default()
        };
        assert!(settings.apply(bad_days).is_err());
    }

    #[test]
    fn null_clears_free_shipping() {
        let mut settings = StoreSettings::default_for(Utc::now());
        settings.free_shipping_threshold = Some(100);
        let patch: SettingsPatch = serde_json::from_str(r#"{"free_shipping_threshold":null}"#).unwrap();
        settings.apply(patch).unwrap();
        assert_eq!(settings.free_shipping_threshold, None);
    }
}
