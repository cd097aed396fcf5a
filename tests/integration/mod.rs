pub mod batch_run_tests;
pub mod scheduler_tests;

use pricewatch::AppConfig;
use pricewatch::config::{
    Channel, DedupPolicy, FetchBackend, LoggingConfig, MetricsConfig, NotificationsConfig, SchedulerConfig,
    ScraperConfig, TwilioConfig,
};
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCOUNT_SID: &str = "AC00000000000000000000000000000000";
pub const CONTACT: &str = "+64211234567";

/// A shop and a messaging provider, both served locally.
pub struct TestEnv {
    pub shop: MockServer,
    pub twilio: MockServer,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self {
            shop: MockServer::start().await,
            twilio: MockServer::start().await,
        }
    }

    pub fn url(&self, page: &str) -> String {
        format!("{}/{}", self.shop.uri(), page)
    }

    /// Configuration pointing at the mock servers, with short timeouts.
    pub fn config(&self) -> AppConfig {
        AppConfig {
            scraper: ScraperConfig {
                backend: FetchBackend::Http,
                max_concurrent_checks: 4,
                retry_attempts: 3,
                retry_delay_ms: 10,
                request_timeout_ms: 300,
                user_agent: "Mozilla/5.0 (pricewatch tests)".to_string(),
                chrome_path: None,
            },
            scheduler: SchedulerConfig {
                default_interval: "0 0 */6 * * *".to_string(),
                job_timeout_secs: 30,
            },
            notifications: NotificationsConfig {
                dedup: DedupPolicy::OncePerCrossing,
                ledger_path: None,
                twilio: TwilioConfig {
                    api_base: self.twilio.uri(),
                    account_sid: Some(ACCOUNT_SID.to_string()),
                    auth_token: Some("test-token".to_string()),
                    from_number: Some("+15005550006".to_string()),
                    channel: Channel::Sms,
                },
            },
            sites: vec![],
            logging: LoggingConfig { directory: None },
            metrics: MetricsConfig {
                enabled: false,
                port: 9001,
            },
        }
    }

    pub async fn serve_page(&self, page: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}", page)))
            .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
            .mount(&self.shop)
            .await;
    }

    /// Accepts every message; `expected` is verified when the server drops.
    pub async fn accept_messages(&self, expected: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/2010-04-01/Accounts/{}/Messages.json", ACCOUNT_SID)))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM0123456789",
                "status": "queued"
            })))
            .expect(expected)
            .mount(&self.twilio)
            .await;
    }
}

pub fn product_page(price_text: &str) -> String {
    format!(
        r#"<html><head><title>Widget</title></head>
           <body><div class="product"><h1>Widget 3000</h1><p class="cost">Now {}</p></div></body></html>"#,
        price_text
    )
}

pub fn watchlist_csv(rows: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "product_url,target_price,phone_number").expect("write header");
    for row in rows {
        writeln!(file, "{}", row).expect("write row");
    }
    file
}
