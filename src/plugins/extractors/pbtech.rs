use scraper::Selector;
use std::sync::LazyLock;

use crate::plugins::traits::{PriceExtractor, SiteRule};

static DATA_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[data-price]").expect("valid selector"));

static LEGACY_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.price").expect("valid selector"));

/// PB Tech product pages. Current listings carry the price in a
/// `data-price` attribute; older ones only render it in `span.price`.
#[derive(Debug)]
pub struct PbTechExtractor {
    rules: Vec<SiteRule>,
}

impl Default for PbTechExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PbTechExtractor {
    pub fn new() -> Self {
        PbTechExtractor {
            rules: vec![
                SiteRule::Attribute {
                    selector: DATA_PRICE.clone(),
                    attribute: "data-price".to_string(),
                    source: "div[data-price]@data-price".to_string(),
                },
                SiteRule::Text {
                    selector: LEGACY_PRICE.clone(),
                    source: "span.price".to_string(),
                },
            ],
        }
    }
}

impl PriceExtractor for PbTechExtractor {
    fn name(&self) -> &str {
        "pbtech"
    }

    fn hosts(&self) -> Vec<String> {
        vec!["pbtech.co.nz".to_string(), "pbtech.com".to_string()]
    }

    fn site_rules(&self) -> &[SiteRule] {
        &self.rules
    }
}
