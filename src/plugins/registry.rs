use scraper::Html;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use super::extractors::{GenericExtractor, PbTechExtractor, SelectorExtractor};
use super::traits::{PriceExtractor, PriceMatch};
use crate::config::SiteConfig;
use crate::utils::error::Result;

pub type ExtractorBox = Arc<dyn PriceExtractor>;

/// Chooses a [`PriceExtractor`] by the product URL's host. Subdomains fall
/// back to their parent domain; unknown hosts use the generic extractor.
#[derive(Clone)]
pub struct ExtractorRegistry {
    by_host: HashMap<String, ExtractorBox>,
    fallback: ExtractorBox,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            by_host: HashMap::new(),
            fallback: Arc::new(GenericExtractor::new()),
        }
    }

    /// Built-in sites.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PbTechExtractor::new()));
        registry
    }

    /// Built-in sites plus the `[[sites]]` from configuration, which take
    /// precedence for the same host.
    pub fn from_config(sites: &[SiteConfig]) -> Result<Self> {
        let mut registry = Self::with_defaults();
        for site in sites {
            registry.register(Arc::new(SelectorExtractor::from_config(site)?));
        }
        Ok(registry)
    }

    pub fn register(&mut self, extractor: ExtractorBox) {
        for host in extractor.hosts() {
            tracing::debug!("Registered extractor '{}' for {}", extractor.name(), host);
            self.by_host.insert(host, Arc::clone(&extractor));
        }
    }

    pub fn list_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.by_host.keys().cloned().collect();
        hosts.sort();
        hosts
    }

    pub fn for_url(&self, url: &str) -> &dyn PriceExtractor {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

        let Some(host) = host else {
            return self.fallback.as_ref();
        };

        let mut candidate = host.trim_start_matches("www.");
        loop {
            if let Some(extractor) = self.by_host.get(candidate) {
                return extractor.as_ref();
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return self.fallback.as_ref(),
            }
        }
    }

    /// Parses `body` and runs the extractor chosen for `url`.
    pub fn extract(&self, url: &str, body: &str) -> Option<PriceMatch> {
        let document = Html::parse_document(body);
        self.for_url(url).locate(&document)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
