use serde::{Deserialize, Serialize};

use shopdesk_core::{DomainError, DomainResult};

/// Order fulfilment lifecycle.
///
/// ```text
/// pending -> processing -> shipped -> delivered
///    \___________\____________\_____-> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a free-form status label.
    ///
    /// Case, surrounding whitespace and `-`/`_`/space separators are ignored,
    /// and common synonyms are accepted ("dispatched", "completed", "void", ...).
    pub fn parse_loose(raw: &str) -> DomainResult<Self> {
        let key: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        let status = match key.as_str() {
            "new" | "pending" | "placed" => OrderStatus::Pending,
            "processing" | "confirmed" | "accepted" | "inprogress" => OrderStatus::Processing,
            "shipped" | "dispatched" | "intransit" | "outfordelivery" => OrderStatus::Shipped,
            "delivered" | "complete" | "completed" | "fulfilled" => OrderStatus::Delivered,
            "cancelled" | "canceled" | "cancel" | "void" | "rejected" => OrderStatus::Cancelled,
            _ => {
                return Err(DomainError::validation(format!(
                    "unknown order status '{}'",
                    raw.trim()
                )));
            }
        };
        Ok(status)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward-only transition table. Same-status moves are not listed here;
    /// callers treat them as no-ops.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Processing | Shipped | Delivered | Cancelled)
                | (Processing, Shipped | Delivered | Cancelled)
                | (Shipped, Delivered | Cancelled)
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    Card,
    BankTransfer,
}
