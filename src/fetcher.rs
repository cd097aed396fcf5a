use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use crate::config::ScraperConfig;
use crate::utils::error::Result;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { attempts: 1 }
        } else if let Some(status) = err.status() {
            FetchError::Status { status: status.as_u16() }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub body: String,
    pub response_time_ms: u64,
}

/// Retrieves product pages. Non-2xx responses and network failures are
/// both reported as [`FetchError`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError>;
}

/// Fixed-delay retry that only repeats timed-out attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    pub async fn run<F, Fut, T>(&self, url: &str, mut operation: F) -> std::result::Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, FetchError>>,
    {
        let strategy = FixedInterval::new(self.delay).take(self.attempts.saturating_sub(1) as usize);
        let attempts = AtomicU32::new(0);

        let result = RetryIf::start(
            strategy,
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                operation()
            },
            |err: &FetchError| {
                let attempt = attempts.load(Ordering::Relaxed);
                let retry = err.is_timeout() && attempt < self.attempts;
                if retry {
                    tracing::warn!(
                        "Fetch of {} timed out (attempt {}/{}), retrying in {:?}",
                        url,
                        attempt,
                        self.attempts,
                        self.delay
                    );
                }
                retry
            },
        )
        .await;

        result.map_err(|err| match err {
            FetchError::Timeout { .. } => FetchError::Timeout {
                attempts: attempts.load(Ordering::Relaxed),
            },
            other => other,
        })
    }
}

/// Static page fetch over HTTP with a fixed browser-like User-Agent.
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            retry: RetryPolicy::from_config(config),
        })
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(FetchError::from_reqwest)?;

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
            response_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        tracing::debug!("Fetching {}", url);
        self.retry.run(url, || self.fetch_once(url)).await
    }
}
