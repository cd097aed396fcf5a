use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{6,14}$").expect("valid phone regex"));

/// One user's price-watch request. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchEntry {
    pub product_url: String,
    pub target_price: Decimal,
    pub contact: String,
}

/// A raw row of the watch list, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRow {
    pub product_url: String,
    pub target_price: String,
    pub phone_number: String,
}

impl WatchEntry {
    /// Builds a validated entry. The contact is stored without spaces,
    /// dashes or parentheses.
    pub fn new(
        product_url: impl Into<String>,
        target_price: Decimal,
        contact: impl Into<String>,
    ) -> Result<Self, ValidationErrors> {
        let entry = WatchEntry {
            product_url: product_url.into().trim().to_string(),
            target_price,
            contact: normalize_contact(&contact.into()),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Key used to remember notifications across runs.
    pub fn ledger_key(&self) -> String {
        format!("{}|{}", self.product_url, self.contact)
    }
}

impl TryFrom<WatchRow> for WatchEntry {
    type Error = ValidationErrors;

    fn try_from(row: WatchRow) -> Result<Self, Self::Error> {
        let cleaned = row.target_price.trim().trim_start_matches('$').replace(',', "");
        let target_price = Decimal::from_str(&cleaned).map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("target_price", error("decimal", "target_price is not a number"));
            errors
        })?;
        WatchEntry::new(row.product_url, target_price, row.phone_number)
    }
}

impl Validate for WatchEntry {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match Url::parse(&self.product_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            _ => errors.add("product_url", error("url", "product_url must be an http(s) URL")),
        }

        if self.target_price <= Decimal::ZERO {
            errors.add("target_price", error("range", "target_price must be greater than 0"));
        }

        if !E164.is_match(&self.contact) {
            errors.add("contact", error("phone", "contact must be an E.164 phone number"));
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn normalize_contact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
