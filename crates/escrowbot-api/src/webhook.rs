//! Webhook notification transport
//!
//! Posts every outbound notification as JSON to a chat gateway, which turns
//! it into a chat message with buttons.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use escrowbot_core::{ActionButton, NotificationPort, NotifyError, NotifyResult};
use escrowbot_types::ChatId;

/// Webhook configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Gateway endpoint receiving the notifications
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Chat the gateway should route operator messages to
    pub admin_chat: Option<ChatId>,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
            admin_chat: None,
        }
    }
}

/// Body posted to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Target chat; absent for operator messages without an admin chat
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    /// True for operator-channel messages
    pub admin: bool,
    pub text: String,
    pub actions: Vec<ActionButton>,
}

/// NotificationPort backed by an HTTP webhook
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn post(&self, payload: &WebhookPayload) -> NotifyResult<()> {
        self.client
            .post(&self.config.url)
            .json(payload)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        tracing::debug!(url = %self.config.url, admin = payload.admin, "Webhook delivered");
        Ok(())
    }

    fn admin_payload(&self, text: &str, actions: &[ActionButton]) -> WebhookPayload {
        WebhookPayload {
            chat_id: self.config.admin_chat,
            admin: true,
            text: text.to_string(),
            actions: actions.to_vec(),
        }
    }
}

#[async_trait]
impl NotificationPort for WebhookNotifier {
    fn name(&self) -> &'static str {
        "Webhook"
    }

    async fn notify(&self, chat: ChatId, text: &str, actions: &[ActionButton]) -> NotifyResult<()> {
        self.post(&WebhookPayload {
            chat_id: Some(chat),
            admin: false,
            text: text.to_string(),
            actions: actions.to_vec(),
        })
        .await
    }

    async fn notify_admin(&self, text: &str, actions: &[ActionButton]) -> NotifyResult<()> {
        self.post(&self.admin_payload(text, actions)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_payload_routing() {
        let mut config = WebhookConfig::new("http://localhost:9/hook");
        config.admin_chat = Some(ChatId(-42));
        let notifier = WebhookNotifier::new(config).unwrap();

        let payload = notifier.admin_payload("release?", &[]);
        assert_eq!(payload.chat_id, Some(ChatId(-42)));
        assert!(payload.admin);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chat_id"], -42);
        assert_eq!(json["text"], "release?");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_delivery_error() {
        let mut config = WebhookConfig::new("http://127.0.0.1:9/hook");
        config.timeout = Duration::from_millis(200);
        let notifier = WebhookNotifier::new(config).unwrap();

        let err = notifier.notify(ChatId(1), "hi", &[]).await.unwrap_err();
        assert!(matches!(err, NotifyError::Delivery(_)));
    }
}
