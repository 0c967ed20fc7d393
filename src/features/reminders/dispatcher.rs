//! Delivery dispatcher boundary
//!
//! The scheduler hands due notifications to a [`Delivery`] implementation and
//! only needs failure to be distinguishable from success; re-delivery after a
//! failure must be safe. The concrete transport here pushes a text message
//! through the LINE Messaging API, but nothing in the core depends on that.

use async_trait::async_trait;
use log::debug;
use serde_json::json;

use super::error::DeliveryError;
use super::model::Notification;

/// LINE push endpoint. Overridable for tests.
pub const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

/// Hard limit the platform places on one text message.
pub const MAX_TEXT_CHARS: usize = 5000;

/// Outbound messaging boundary consumed by the scheduler.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Pushes reminder messages to the notification owner over the LINE
/// Messaging API. Stateless per call, so retrying a failed delivery on the
/// next cycle at worst sends the message again.
pub struct LinePushDispatcher {
    http: reqwest::Client,
    endpoint: String,
    channel_token: String,
}

impl LinePushDispatcher {
    pub fn new(channel_token: String) -> Self {
        LinePushDispatcher {
            http: reqwest::Client::new(),
            endpoint: LINE_PUSH_ENDPOINT.to_string(),
            channel_token,
        }
    }

    /// Point at a different endpoint (test servers).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn message_text(notification: &Notification) -> String {
        let text = format!("🔔 通知: {}\n📝 {}", notification.title, notification.body);
        if text.chars().count() <= MAX_TEXT_CHARS {
            text
        } else {
            text.chars().take(MAX_TEXT_CHARS).collect()
        }
    }
}

#[async_trait]
impl Delivery for LinePushDispatcher {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let body = json!({
            "to": notification.owner,
            "messages": [{
                "type": "text",
                "text": Self::message_text(notification),
            }],
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.channel_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Failed(format!("push request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(DeliveryError::RateLimited);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Failed(format!(
                "push rejected with {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        debug!(
            "Delivered notification {} to {}",
            notification.id, notification.owner
        );
        Ok(())
    }
}
