use chrono::Utc;
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use tokio::time::Instant;

use crate::browser::BrowserFetcher;
use crate::config::{AppConfig, FetchBackend, ScraperConfig};
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::ledger::NotificationLedger;
use crate::models::{NotificationEvent, Outcome, PriceReading, RunReport, RunResult, RunSummary, WatchEntry};
use crate::plugins::ExtractorRegistry;
use crate::plugins::notifiers::{LogNotifier, TwilioNotifier};
use crate::plugins::traits::Notifier;
use crate::utils::error::Result;

pub fn build_fetcher(config: &ScraperConfig) -> Result<Arc<dyn PageFetcher>> {
    Ok(match config.backend {
        FetchBackend::Http => Arc::new(HttpFetcher::new(config)?),
        FetchBackend::Browser => Arc::new(BrowserFetcher::new(config)?),
    })
}

/// Checks every watch entry once: fetch, extract, compare, notify.
pub struct BatchRunner {
    fetcher: Arc<dyn PageFetcher>,
    extractors: Arc<ExtractorRegistry>,
    notifier: Arc<dyn Notifier>,
    ledger: Arc<NotificationLedger>,
    max_concurrent: usize,
}

impl BatchRunner {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractors: Arc<ExtractorRegistry>,
        notifier: Arc<dyn Notifier>,
        ledger: Arc<NotificationLedger>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            fetcher,
            extractors,
            notifier,
            ledger,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Wires up the configured fetch backend, site rules, ledger and
    /// notifier. In dry-run mode messages are only logged and Twilio
    /// credentials are not required.
    pub async fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self> {
        let fetcher = build_fetcher(&config.scraper)?;

        let notifier: Arc<dyn Notifier> = if dry_run {
            tracing::info!("Dry run: notifications will be logged, not sent");
            Arc::new(LogNotifier::new())
        } else {
            Arc::new(TwilioNotifier::from_config(&config.notifications.twilio)?)
        };

        let extractors = ExtractorRegistry::from_config(&config.sites)?;
        let ledger = NotificationLedger::open(
            config.notifications.dedup.clone(),
            config.notifications.ledger_path.clone(),
        )
        .await?;

        Ok(Self::new(
            fetcher,
            Arc::new(extractors),
            notifier,
            Arc::new(ledger),
            config.scraper.max_concurrent_checks,
        ))
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    /// One result per entry, in input order. Entries are checked
    /// concurrently up to `max_concurrent` at a time.
    pub async fn run(&self, entries: &[WatchEntry]) -> Vec<RunResult> {
        let checks: Vec<_> = entries.iter().map(|entry| self.check_entry(entry)).collect();
        stream::iter(checks).buffered(self.max_concurrent).collect().await
    }

    /// Runs the batch, persists the ledger and summarizes the outcomes.
    pub async fn run_batch(&self, entries: &[WatchEntry]) -> RunReport {
        let started_at = Utc::now();
        tracing::info!("Checking {} watch entries", entries.len());

        let results = self.run(entries).await;

        if let Err(e) = self.ledger.save().await {
            tracing::error!("Failed to save notification ledger: {}", e);
        }

        let summary = RunSummary::from_results(started_at, &results);
        tracing::info!(
            run_id = %summary.run_id,
            "Run complete: {} entries, {} notified, {} failed notifications, {} fetch errors, {} without price",
            summary.total,
            summary.count("notified"),
            summary.count("notification_failed"),
            summary.count("fetch_error"),
            summary.count("price_not_found"),
        );

        RunReport { summary, results }
    }

    pub async fn check_entry(&self, entry: &WatchEntry) -> RunResult {
        let (reading, outcome) = self.evaluate(entry).await;
        let outcome_label = outcome.label();

        counter!("pricewatch_entries_total", "outcome" => outcome_label).increment(1);
        if outcome.attempted_notification() {
            counter!("pricewatch_notifications_total", "outcome" => outcome_label).increment(1);
        }
        tracing::info!(url = %entry.product_url, outcome = outcome_label, "Checked entry");

        RunResult { reading, outcome }
    }

    async fn evaluate(&self, entry: &WatchEntry) -> (PriceReading, Outcome) {
        let start_time = Instant::now();
        let fetched = self.fetcher.fetch(&entry.product_url).await;
        histogram!("pricewatch_fetch_duration_seconds").record(start_time.elapsed().as_secs_f64());

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", entry.product_url, e);
                return (
                    PriceReading::new(entry.clone(), None),
                    Outcome::FetchError { error: e.to_string() },
                );
            }
        };

        let Some(found) = self.extractors.extract(&entry.product_url, &page.body) else {
            tracing::debug!("No price found on {}", entry.product_url);
            return (PriceReading::new(entry.clone(), None), Outcome::PriceNotFound);
        };
        let price = found.price;
        tracing::debug!(
            "Found price {} on {} via {:?} ({})",
            price,
            entry.product_url,
            found.strategy,
            found.rule
        );

        let reading = PriceReading::new(entry.clone(), Some(price));
        if reading.is_at_or_below_target() != Some(true) {
            self.ledger.rearm(entry).await;
            return (reading, Outcome::AboveTarget { price });
        }

        if let Some(previous) = self.ledger.previous(entry).await {
            tracing::debug!(
                "Already notified {} about {} at {}",
                entry.contact,
                entry.product_url,
                previous.notified_at
            );
            return (
                reading,
                Outcome::AlreadyNotified {
                    price,
                    notified_at: previous.notified_at,
                },
            );
        }

        let event = NotificationEvent::new(entry.clone(), price);
        let outcome = match self.notifier.send(&entry.contact, &event.message_body).await {
            Ok(receipt) => {
                // Persist straight away so a batch cut short by the job
                // timeout cannot forget a message that was delivered.
                self.ledger.record(entry, price).await;
                if let Err(e) = self.ledger.save().await {
                    tracing::error!("Failed to save notification ledger: {}", e);
                }
                Outcome::Notified {
                    price,
                    message_id: receipt.message_id,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to notify {} about {}: {}", entry.contact, entry.product_url, e);
                Outcome::NotificationFailed {
                    price,
                    error: e.to_string(),
                }
            }
        };

        (reading, outcome)
    }
}
