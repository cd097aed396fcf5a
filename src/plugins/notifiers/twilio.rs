use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Channel, TwilioConfig};
use crate::plugins::traits::{DeliveryError, DeliveryReceipt, Notifier};
use crate::utils::error::Result;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResource {
    code: Option<i64>,
    message: Option<String>,
}

/// Sends SMS or WhatsApp messages through the Twilio Messages API.
pub struct TwilioNotifier {
    client: Client,
    endpoint: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    channel: Channel,
}

impl TwilioNotifier {
    pub fn from_config(config: &TwilioConfig) -> Result<Self> {
        let (account_sid, auth_token, from_number) = config.credentials()?;
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                config.api_base.trim_end_matches('/'),
                account_sid
            ),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
            channel: config.channel.clone(),
        })
    }

    fn address(&self, number: &str) -> String {
        match self.channel {
            Channel::Sms => number.to_string(),
            Channel::Whatsapp => format!("whatsapp:{}", number),
        }
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, to: &str, body: &str) -> std::result::Result<DeliveryReceipt, DeliveryError> {
        let to = self.address(to);
        let from = self.address(&self.from_number);
        let form = [("To", to.as_str()), ("From", from.as_str()), ("Body", body)];

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if status.is_success() {
            let message_id = serde_json::from_str::<MessageResource>(&text)
                .ok()
                .and_then(|m| m.sid);
            tracing::debug!("Twilio accepted message to {} ({:?})", to, message_id);
            return Ok(DeliveryReceipt { message_id });
        }

        let (code, message) = match serde_json::from_str::<ErrorResource>(&text) {
            Ok(err) => (err.code, err.message.unwrap_or_else(|| text.clone())),
            Err(_) => (None, text),
        };

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            code,
            message,
        })
    }
}
