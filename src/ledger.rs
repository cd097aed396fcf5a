use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

use crate::config::DedupPolicy;
use crate::models::WatchEntry;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub price: Decimal,
    pub notified_at: DateTime<Utc>,
}

/// Remembers which (url, contact) pairs were already told about the
/// current threshold crossing. A reading above target re-arms the pair.
pub struct NotificationLedger {
    policy: DedupPolicy,
    path: Option<PathBuf>,
    records: RwLock<HashMap<String, LedgerRecord>>,
    // Concurrent saves share one temp file.
    save_lock: Mutex<()>,
}

impl NotificationLedger {
    pub fn in_memory(policy: DedupPolicy) -> Self {
        Self {
            policy,
            path: None,
            records: RwLock::new(HashMap::new()),
            save_lock: Mutex::new(()),
        }
    }

    /// Loads the ledger from `path` if the file exists. A missing file is an
    /// empty ledger; a corrupt one is an error.
    pub async fn open(policy: DedupPolicy, path: Option<PathBuf>) -> Result<Self> {
        let records = match &path {
            Some(path) if tokio::fs::try_exists(path).await? => {
                let raw = tokio::fs::read_to_string(path).await?;
                let records: HashMap<String, LedgerRecord> = serde_json::from_str(&raw)?;
                tracing::debug!("Loaded {} ledger record(s) from {}", records.len(), path.display());
                records
            }
            _ => HashMap::new(),
        };

        Ok(Self {
            policy,
            path,
            records: RwLock::new(records),
            save_lock: Mutex::new(()),
        })
    }

    /// The earlier notification for this crossing, if it suppresses a new one.
    pub async fn previous(&self, entry: &WatchEntry) -> Option<LedgerRecord> {
        if self.policy == DedupPolicy::EveryRun {
            return None;
        }
        self.records.read().await.get(&entry.ledger_key()).cloned()
    }

    pub async fn record(&self, entry: &WatchEntry, price: Decimal) {
        if self.policy == DedupPolicy::EveryRun {
            return;
        }
        let record = LedgerRecord {
            price,
            notified_at: Utc::now(),
        };
        self.records.write().await.insert(entry.ledger_key(), record);
    }

    pub async fn rearm(&self, entry: &WatchEntry) {
        if self.records.write().await.remove(&entry.ledger_key()).is_some() {
            tracing::debug!("Re-armed {} for {}", entry.product_url, entry.contact);
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Writes the ledger atomically (temp file then rename). No-op for an
    /// in-memory ledger.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _saving = self.save_lock.lock().await;

        let json = {
            let records = self.records.read().await;
            serde_json::to_string_pretty(&*records)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!("Saved notification ledger to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn entry() -> WatchEntry {
        WatchEntry::new("https://shop.example/p1", Decimal::from(100), "+64211234567").unwrap()
    }

    fn price(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_record_then_previous() {
        let ledger = NotificationLedger::in_memory(DedupPolicy::OncePerCrossing);
        assert!(ledger.previous(&entry()).await.is_none());

        ledger.record(&entry(), price("89.99")).await;
        let previous = ledger.previous(&entry()).await.unwrap();
        assert_eq!(previous.price, price("89.99"));
    }

    #[tokio::test]
    async fn test_rearm_clears_record() {
        let ledger = NotificationLedger::in_memory(DedupPolicy::OncePerCrossing);
        ledger.record(&entry(), price("89.99")).await;
        ledger.rearm(&entry()).await;

        assert!(ledger.previous(&entry()).await.is_none());
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_every_run_never_suppresses() {
        let ledger = NotificationLedger::in_memory(DedupPolicy::EveryRun);
        ledger.record(&entry(), price("89.99")).await;

        assert!(ledger.previous(&entry()).await.is_none());
        assert_eq!(ledger.len().await, 0);
    }

    #[tokio::test]
    async fn test_entries_are_keyed_by_contact() {
        let ledger = NotificationLedger::in_memory(DedupPolicy::OncePerCrossing);
        ledger.record(&entry(), price("89.99")).await;

        let other = WatchEntry::new("https://shop.example/p1", Decimal::from(100), "+64219999999").unwrap();
        assert!(ledger.previous(&other).await.is_none());
    }

    #[tokio::test]
    async fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ledger.json");

        let ledger = NotificationLedger::open(DedupPolicy::OncePerCrossing, Some(path.clone()))
            .await
            .unwrap();
        assert!(ledger.is_empty().await);
        ledger.record(&entry(), price("89.99")).await;
        ledger.save().await.unwrap();

        let reopened = NotificationLedger::open(DedupPolicy::OncePerCrossing, Some(path))
            .await
            .unwrap();
        assert_eq!(reopened.previous(&entry()).await.unwrap().price, price("89.99"));
    }

    #[tokio::test]
    async fn test_concurrent_saves_all_succeed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let ledger = NotificationLedger::open(DedupPolicy::OncePerCrossing, Some(path.clone()))
            .await
            .unwrap();
        ledger.record(&entry(), price("89.99")).await;

        let (a, b, c) = tokio::join!(ledger.save(), ledger.save(), ledger.save());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let reopened = NotificationLedger::open(DedupPolicy::OncePerCrossing, Some(path))
            .await
            .unwrap();
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = NotificationLedger::open(DedupPolicy::OncePerCrossing, Some(path)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_save_is_noop() {
        let ledger = NotificationLedger::in_memory(DedupPolicy::OncePerCrossing);
        ledger.record(&entry(), price("1")).await;
        assert!(ledger.save().await.is_ok());
    }
}
