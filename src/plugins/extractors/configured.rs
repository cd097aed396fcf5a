use crate::config::SiteConfig;
use crate::plugins::traits::{PriceExtractor, SiteRule};
use crate::utils::error::Result;

/// A site described in configuration rather than code.
#[derive(Debug)]
pub struct SelectorExtractor {
    host: String,
    rules: Vec<SiteRule>,
}

impl SelectorExtractor {
    pub fn from_config(site: &SiteConfig) -> Result<Self> {
        let host = site.host.trim().trim_start_matches("www.").to_ascii_lowercase();
        let rule = match &site.price_attribute {
            Some(attribute) => SiteRule::attribute(&host, &site.price_selector, attribute)?,
            None => SiteRule::text(&host, &site.price_selector)?,
        };

        Ok(Self {
            host,
            rules: vec![rule],
        })
    }
}

impl PriceExtractor for SelectorExtractor {
    fn name(&self) -> &str {
        &self.host
    }

    fn hosts(&self) -> Vec<String> {
        vec![self.host.clone()]
    }

    fn site_rules(&self) -> &[SiteRule] {
        &self.rules
    }
}
