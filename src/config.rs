use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    Http,
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub backend: FetchBackend,
    pub max_concurrent_checks: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub chrome_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub default_interval: String,
    pub job_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Notify again on every run while the price stays at or below target.
    EveryRun,
    /// Notify once, then stay quiet until the price goes back above target.
    OncePerCrossing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub dedup: DedupPolicy,
    pub ledger_path: Option<PathBuf>,
    pub twilio: TwilioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Whatsapp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub api_base: String,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub channel: Channel,
}

/// Extra site rule: pages on `host` carry their price in `price_selector`,
/// either as element text or in `price_attribute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub host: String,
    pub price_selector: String,
    pub price_attribute: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Layers defaults, `config/*.toml`, an optional explicit file and
    /// `PRICEWATCH__` environment variables, in that order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("scraper.backend", "http")?
            .set_default("scraper.max_concurrent_checks", 4)?
            .set_default("scraper.retry_attempts", 3)?
            .set_default("scraper.retry_delay_ms", 2000)?
            .set_default("scraper.request_timeout_ms", 15000)?
            .set_default("scraper.user_agent", "Mozilla/5.0")?
            .set_default("scheduler.default_interval", "0 0 */6 * * *")?
            .set_default("scheduler.job_timeout_secs", 900)?
            .set_default("notifications.dedup", "once_per_crossing")?
            .set_default("notifications.twilio.api_base", "https://api.twilio.com")?
            .set_default("notifications.twilio.channel", "sms")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9001)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, ignored by git
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        let s = builder
            .add_source(Environment::with_prefix("PRICEWATCH").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.max_concurrent_checks == 0 {
            return Err(ConfigError::Message("Scraper max_concurrent_checks must be greater than 0".into()));
        }

        if self.scraper.retry_attempts == 0 {
            return Err(ConfigError::Message("Scraper retry_attempts must be at least 1".into()));
        }

        if self.scraper.request_timeout_ms == 0 {
            return Err(ConfigError::Message("Scraper request_timeout_ms must be greater than 0".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        if !self.is_valid_cron(&self.scheduler.default_interval) {
            return Err(ConfigError::Message("Invalid cron expression in scheduler.default_interval".into()));
        }

        if self.scheduler.job_timeout_secs == 0 {
            return Err(ConfigError::Message("Scheduler job_timeout_secs must be greater than 0".into()));
        }

        if Url::parse(&self.notifications.twilio.api_base).is_err() {
            return Err(ConfigError::Message("Invalid notifications.twilio.api_base URL".into()));
        }

        for site in &self.sites {
            if site.host.trim().is_empty() || site.host.contains('/') {
                return Err(ConfigError::Message(format!("Invalid site host '{}'", site.host)));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }

    /// Six fields (with seconds) or seven (with year), as the cron scheduler expects.
    pub fn is_valid_cron(&self, cron_expr: &str) -> bool {
        let parts: Vec<&str> = cron_expr.split_whitespace().collect();
        if parts.len() != 6 && parts.len() != 7 {
            return false;
        }

        parts.iter().all(|part| {
            part.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '*' | '-' | ',' | '/' | '?')
            })
        })
    }
}

impl TwilioConfig {
    /// Credentials are only needed when messages are really sent.
    pub fn credentials(&self) -> Result<(&str, &str, &str), ConfigError> {
        let missing = |key: &str| {
            ConfigError::Message(format!(
                "notifications.twilio.{key} is not set (PRICEWATCH__NOTIFICATIONS__TWILIO__{})",
                key.to_uppercase()
            ))
        };
        let sid = self.account_sid.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| missing("account_sid"))?;
        let token = self.auth_token.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| missing("auth_token"))?;
        let from = self.from_number.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| missing("from_number"))?;
        Ok((sid, token, from))
    }
}
