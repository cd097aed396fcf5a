use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::WatchEntry;

/// What one run observed for one entry. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceReading {
    pub entry: WatchEntry,
    pub observed_price: Option<Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl PriceReading {
    pub fn new(entry: WatchEntry, observed_price: Option<Decimal>) -> Self {
        Self {
            entry,
            observed_price,
            fetched_at: Utc::now(),
        }
    }

    /// `Some(true)` when the observed price is at or below target.
    pub fn is_at_or_below_target(&self) -> Option<bool> {
        self.observed_price.map(|price| price <= self.entry.target_price)
    }
}

/// A message about to be sent for an entry whose price reached its target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub entry: WatchEntry,
    pub price: Decimal,
    pub message_body: String,
}

impl NotificationEvent {
    pub fn new(entry: WatchEntry, price: Decimal) -> Self {
        let message_body = format!(
            "Price drop! {} is now ${:.2} (your target: ${:.2}).",
            entry.product_url, price, entry.target_price
        );
        Self {
            entry,
            price,
            message_body,
        }
    }
}
