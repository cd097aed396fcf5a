use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::plugins::extractors::fallback;
use crate::utils::error::AppError;
use crate::utils::price::parse_price_text;

/// Which tier of the fallback chain produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    SiteSelector,
    Metadata,
    CurrencyPattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMatch {
    pub price: Decimal,
    pub strategy: StrategyKind,
    /// The selector or rule that matched, for logs.
    pub rule: String,
}

/// A site-specific location of the price-bearing element.
#[derive(Debug, Clone)]
pub enum SiteRule {
    Text {
        selector: Selector,
        source: String,
    },
    Attribute {
        selector: Selector,
        attribute: String,
        source: String,
    },
}

impl SiteRule {
    pub fn text(site: &str, selector: &str) -> Result<Self, AppError> {
        Ok(SiteRule::Text {
            selector: parse_selector(site, selector)?,
            source: selector.to_string(),
        })
    }

    pub fn attribute(site: &str, selector: &str, attribute: &str) -> Result<Self, AppError> {
        Ok(SiteRule::Attribute {
            selector: parse_selector(site, selector)?,
            attribute: attribute.to_string(),
            source: format!("{}@{}", selector, attribute),
        })
    }

    pub fn source(&self) -> &str {
        match self {
            SiteRule::Text { source, .. } | SiteRule::Attribute { source, .. } => source,
        }
    }

    /// First matching element whose value parses as a positive price. A zero
    /// placeholder falls through like an unparseable one.
    pub fn apply(&self, document: &Html) -> Option<Decimal> {
        let positive = |price: &Decimal| *price > Decimal::ZERO;
        match self {
            SiteRule::Text { selector, .. } => document
                .select(selector)
                .find_map(|element| parse_price_text(&element.text().collect::<String>()).filter(positive)),
            SiteRule::Attribute { selector, attribute, .. } => document
                .select(selector)
                .filter_map(|element| element.value().attr(attribute))
                .find_map(|raw| parse_price_text(raw).filter(positive)),
        }
    }
}

fn parse_selector(site: &str, selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|_| AppError::InvalidSelector {
        site: site.to_string(),
        selector: selector.to_string(),
    })
}

/// Locates a product price in a fetched page.
///
/// Implementations only supply their site rules; the default `locate`
/// degrades through site rules, structured metadata and finally a
/// currency pattern over the visible text, and yields `None` when every
/// tier comes up empty.
pub trait PriceExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Hosts this extractor is registered for, without `www.`.
    fn hosts(&self) -> Vec<String>;

    fn site_rules(&self) -> &[SiteRule];

    fn locate(&self, document: &Html) -> Option<PriceMatch> {
        for rule in self.site_rules() {
            if let Some(price) = rule.apply(document) {
                return Some(PriceMatch {
                    price,
                    strategy: StrategyKind::SiteSelector,
                    rule: rule.source().to_string(),
                });
            }
        }

        if let Some((price, rule)) = fallback::metadata_price(document) {
            return Some(PriceMatch {
                price,
                strategy: StrategyKind::Metadata,
                rule: rule.to_string(),
            });
        }

        fallback::text_price(document).map(|price| PriceMatch {
            price,
            strategy: StrategyKind::CurrencyPattern,
            rule: "currency pattern".to_string(),
        })
    }

    fn extract(&self, document: &Html) -> Option<Decimal> {
        self.locate(document).map(|found| found.price)
    }
}
