use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

// Grouped amounts must contain at least one thousands separator, otherwise
// "1299.00" would stop at "129".
const AMOUNT: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)";

static LOOSE_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:[A-Z]{{2}})?[\$£€¥₹]?\s*{AMOUNT}")).expect("valid price regex")
});

static CURRENCY_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:(?:NZ|AU|US|CA|A|C)?\$|£|€|¥|₹|\b(?:NZD|AUD|USD|GBP|EUR)\s?)\s*{AMOUNT}"
    ))
    .expect("valid currency regex")
});

/// Normalizes the text of a price-bearing element: currency symbols and
/// thousands separators are dropped and the first amount is returned.
///
/// `"$1,299.00"` becomes `1299.00`, `"$49"` becomes `49`.
pub fn parse_price_text(text: &str) -> Option<Decimal> {
    let captures = LOOSE_PRICE.captures(text.trim())?;
    to_decimal(captures.get(1)?.as_str())
}

/// Finds the first amount in free text that is explicitly marked with a
/// currency symbol or code. Bare numbers are ignored.
pub fn find_currency_amount(text: &str) -> Option<Decimal> {
    let captures = CURRENCY_PRICE.captures(text)?;
    to_decimal(captures.get(1)?.as_str())
}

fn to_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', "")).ok()
}
