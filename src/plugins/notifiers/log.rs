use async_trait::async_trait;
use uuid::Uuid;

use crate::plugins::traits::{DeliveryError, DeliveryReceipt, Notifier};

/// Dry-run notifier: writes the message to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError> {
        tracing::info!(to = %to, "[dry-run] {}", body);
        Ok(DeliveryReceipt {
            message_id: Some(format!("dry-run-{}", Uuid::new_v4())),
        })
    }
}
