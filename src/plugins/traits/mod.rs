pub mod extractor;
pub mod notifier;

pub use extractor::{PriceExtractor, PriceMatch, SiteRule, StrategyKind};
pub use notifier::{DeliveryError, DeliveryReceipt, Notifier};

#[cfg(test)]
pub use notifier::MockNotifier;
