use async_trait::async_trait;
use headless_chrome::util::Timeout as WaitTimeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::ScraperConfig;
use crate::fetcher::{FetchError, FetchedPage, PageFetcher, RetryPolicy};
use crate::utils::error::{AppError, Result};

/// Round-robin set of headless Chrome instances.
pub struct BrowserPool {
    browsers: Vec<Arc<Browser>>,
    current_index: AtomicUsize,
}

/// Fetches pages through a real browser for sites that render prices with
/// JavaScript. Navigation cannot see the HTTP status, so any page that
/// finishes loading counts as a 200.
pub struct BrowserFetcher {
    browser_pool: Arc<BrowserPool>,
    user_agent: String,
    timeout: Duration,
    retry: RetryPolicy,
}

// Chrome instances are heavy; never start more than this many.
const MAX_BROWSERS: usize = 3;

fn pool_size(max_concurrent_checks: usize) -> usize {
    max_concurrent_checks.clamp(1, MAX_BROWSERS)
}

impl BrowserPool {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut browsers = Vec::new();

        for _ in 0..pool_size(config.max_concurrent_checks) {
            let mut launch_options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false) // Often needed in containerized environments
                .args(vec![
                    std::ffi::OsStr::new("--no-sandbox"),
                    std::ffi::OsStr::new("--disable-dev-shm-usage"),
                    std::ffi::OsStr::new("--disable-gpu"),
                    std::ffi::OsStr::new("--disable-extensions"),
                ])
                .build()
                .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

            if let Some(chrome_path) = &config.chrome_path {
                launch_options.path = Some(std::path::PathBuf::from(chrome_path));
            }

            let browser = Browser::new(launch_options)
                .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

            browsers.push(Arc::new(browser));
        }

        Ok(Self {
            browsers,
            current_index: AtomicUsize::new(0),
        })
    }

    pub fn get_browser(&self) -> Option<Arc<Browser>> {
        if self.browsers.is_empty() {
            return None;
        }
        let index = self.current_index.fetch_add(1, Ordering::Relaxed) % self.browsers.len();
        self.browsers.get(index).cloned()
    }
}

impl BrowserFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let browser_pool = Arc::new(BrowserPool::new(config)?);
        tracing::info!("Started {} headless browser(s)", browser_pool.browsers.len());

        Ok(Self {
            browser_pool,
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_millis(config.request_timeout_ms),
            retry: RetryPolicy::from_config(config),
        })
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        let browser = self
            .browser_pool
            .get_browser()
            .ok_or_else(|| FetchError::Network("no browser available".to_string()))?;
        let url = url.to_string();
        let user_agent = self.user_agent.clone();
        let timeout = self.timeout;

        let task = tokio::task::spawn_blocking(move || load_page(&browser, &url, &user_agent, timeout));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(FetchError::Network(format!("browser task failed: {}", join_error))),
            Err(_) => Err(FetchError::Timeout { attempts: 1 }),
        }
    }
}

/// Closes the tab when dropped, whichever way `load_page` returns.
struct OpenTab(Arc<Tab>);

impl Drop for OpenTab {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(true) {
            tracing::debug!("Failed to close browser tab: {}", e);
        }
    }
}

/// A wait that ran out is a timeout and may be retried; anything else is
/// reported as a network failure.
fn browser_error(context: &str, err: anyhow::Error) -> FetchError {
    if err.is::<WaitTimeout>() {
        FetchError::Timeout { attempts: 1 }
    } else {
        FetchError::Network(format!("{}: {}", context, err))
    }
}

fn load_page(
    browser: &Browser,
    url: &str,
    user_agent: &str,
    timeout: Duration,
) -> std::result::Result<FetchedPage, FetchError> {
    let start_time = Instant::now();

    let tab = OpenTab(browser.new_tab().map_err(|e| browser_error("Failed to create tab", e))?);
    tab.0.set_default_timeout(timeout);

    tab.0
        .set_user_agent(user_agent, None, None)
        .map_err(|e| browser_error("Failed to set user agent", e))?;

    tab.0
        .navigate_to(url)
        .map_err(|e| browser_error("Navigation failed", e))?;
    tab.0
        .wait_until_navigated()
        .map_err(|e| browser_error("Page load failed", e))?;

    let final_url = {
        let current = tab.0.get_url();
        if current.is_empty() { url.to_string() } else { current }
    };

    let body = tab
        .0
        .get_content()
        .map_err(|e| browser_error("Failed to get page content", e))?;

    Ok(FetchedPage {
        final_url,
        status: 200,
        body,
        response_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        tracing::debug!("Loading {} in headless browser", url);
        self.retry.run(url, || self.fetch_once(url)).await
    }
}
