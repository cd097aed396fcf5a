use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::PriceReading;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Notified {
        price: Decimal,
        message_id: Option<String>,
    },
    NotificationFailed {
        price: Decimal,
        error: String,
    },
    /// At or below target, but this crossing was already reported.
    AlreadyNotified {
        price: Decimal,
        notified_at: DateTime<Utc>,
    },
    AboveTarget {
        price: Decimal,
    },
    PriceNotFound,
    FetchError {
        error: String,
    },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Notified { .. } => "notified",
            Outcome::NotificationFailed { .. } => "notification_failed",
            Outcome::AlreadyNotified { .. } => "already_notified",
            Outcome::AboveTarget { .. } => "above_target",
            Outcome::PriceNotFound => "price_not_found",
            Outcome::FetchError { .. } => "fetch_error",
        }
    }

    /// Whether the notifier was called for this entry.
    pub fn attempted_notification(&self) -> bool {
        matches!(self, Outcome::Notified { .. } | Outcome::NotificationFailed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub reading: PriceReading,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub outcomes: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn from_results(started_at: DateTime<Utc>, results: &[RunResult]) -> Self {
        let mut outcomes = BTreeMap::new();
        for result in results {
            *outcomes.entry(result.outcome.label().to_string()).or_insert(0) += 1;
        }

        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            total: results.len(),
            outcomes,
        }
    }

    pub fn count(&self, label: &str) -> usize {
        self.outcomes.get(label).copied().unwrap_or(0)
    }
}

/// Everything a `--report` file contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub results: Vec<RunResult>,
}
