use crate::plugins::traits::{PriceExtractor, SiteRule};

/// Used for hosts without a registered extractor: metadata first, then
/// the first currency amount in the page text.
#[derive(Debug, Default)]
pub struct GenericExtractor;

impl GenericExtractor {
    pub fn new() -> Self {
        GenericExtractor
    }
}

impl PriceExtractor for GenericExtractor {
    fn name(&self) -> &str {
        "generic"
    }

    fn hosts(&self) -> Vec<String> {
        Vec::new()
    }

    fn site_rules(&self) -> &[SiteRule] {
        &[]
    }
}
