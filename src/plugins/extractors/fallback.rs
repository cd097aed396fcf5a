//! Site-independent tiers of the extraction chain.

use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde_json::Value;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::utils::price::{find_currency_amount, parse_price_text};

static ITEMPROP_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="price"]"#).expect("valid selector"));

static META_PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="product:price:amount"], meta[property="og:price:amount"]"#)
        .expect("valid selector")
});

static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector"));

/// Structured price metadata: microdata, Open Graph product tags, then
/// schema.org JSON-LD offers.
pub fn metadata_price(document: &Html) -> Option<(Decimal, &'static str)> {
    for element in document.select(&ITEMPROP_PRICE) {
        let raw = match element.value().attr("content") {
            Some(content) => content.to_string(),
            None => element.text().collect::<String>(),
        };
        if let Some(price) = parse_price_text(&raw).filter(is_positive) {
            return Some((price, "itemprop=price"));
        }
    }

    for element in document.select(&META_PRICE) {
        if let Some(price) = element
            .value()
            .attr("content")
            .and_then(parse_price_text)
            .filter(is_positive)
        {
            return Some((price, "meta price:amount"));
        }
    }

    for element in document.select(&JSON_LD) {
        let script = element.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&script) else {
            continue;
        };
        if let Some(price) = json_ld_price(&value) {
            return Some((price, "json-ld price"));
        }
    }

    None
}

/// First currency-marked amount in the page's visible text.
pub fn text_price(document: &Html) -> Option<Decimal> {
    find_currency_amount(&visible_text(document)).filter(is_positive)
}

/// The node's own price, then its `offers`, and only then any other nested
/// object. Keys are visited in sorted order, so related products such as
/// `isRelatedTo` would otherwise be searched before `offers`.
fn json_ld_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Object(map) => {
            for key in ["price", "lowPrice"] {
                if let Some(price) = map.get(key).and_then(json_number) {
                    return Some(price);
                }
            }
            if let Some(price) = map.get("offers").and_then(json_ld_price) {
                return Some(price);
            }
            map.iter()
                .filter(|(key, _)| key.as_str() != "offers")
                .find_map(|(_, nested)| json_ld_price(nested))
        }
        Value::Array(items) => items.iter().find_map(json_ld_price),
        _ => None,
    }
}

fn json_number(value: &Value) -> Option<Decimal> {
    let price = match value {
        Value::String(s) => parse_price_text(s),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    };
    price.filter(is_positive)
}

fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| matches!(e.name(), "script" | "style" | "noscript")))
            .unwrap_or(false);
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }
    text
}

fn is_positive(price: &Decimal) -> bool {
    *price > Decimal::ZERO
}
