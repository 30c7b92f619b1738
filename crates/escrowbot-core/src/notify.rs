//! Outbound notification port
//!
//! The state machine never talks to a chat network directly. Each accepted
//! transition renders a list of [`Notification`]s that are delivered through
//! a [`NotificationPort`] after the ticket lock is released.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use escrowbot_types::{ChatId, TicketId};

use crate::command::Action;

/// Notification delivery error
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

pub type NotifyResult<T> = std::result::Result<T, NotifyError>;

/// Where a notification goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "chat_id", rename_all = "snake_case")]
pub enum Recipient {
    /// The trade's group chat
    Chat(ChatId),
    /// The operator channel
    Admin,
}

/// An action the recipient may take next, rendered as a button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub ticket_id: TicketId,
    pub action: Action,
}

impl ActionButton {
    pub fn new(label: impl Into<String>, ticket_id: &TicketId, action: Action) -> Self {
        Self {
            label: label.into(),
            ticket_id: ticket_id.clone(),
            action,
        }
    }
}

/// A rendered outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub text: String,
    pub actions: Vec<ActionButton>,
}

impl Notification {
    pub fn chat(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::Chat(chat),
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn admin(text: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::Admin,
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<ActionButton>) -> Self {
        self.actions = actions;
        self
    }
}

/// Outbound messaging seam implemented by each chat transport
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Transport name for logging
    fn name(&self) -> &'static str;

    /// Post a message to a chat
    async fn notify(&self, chat: ChatId, text: &str, actions: &[ActionButton]) -> NotifyResult<()>;

    /// Post a message to the operator channel
    async fn notify_admin(&self, text: &str, actions: &[ActionButton]) -> NotifyResult<()>;
}

/// Deliver notifications in order; failures are logged, never propagated
pub async fn deliver(port: &dyn NotificationPort, notifications: &[Notification]) {
    for notification in notifications {
        let result = match notification.recipient {
            Recipient::Chat(chat) => {
                port.notify(chat, &notification.text, &notification.actions)
                    .await
            }
            Recipient::Admin => {
                port.notify_admin(&notification.text, &notification.actions)
                    .await
            }
        };
        if let Err(e) = result {
            tracing::warn!(
                transport = port.name(),
                recipient = ?notification.recipient,
                error = %e,
                "Notification delivery failed"
            );
        }
    }
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationPort for TracingNotifier {
    fn name(&self) -> &'static str {
        "Tracing"
    }

    async fn notify(&self, chat: ChatId, text: &str, actions: &[ActionButton]) -> NotifyResult<()> {
        tracing::info!(chat_id = %chat, actions = actions.len(), "{}", text);
        Ok(())
    }

    async fn notify_admin(&self, text: &str, actions: &[ActionButton]) -> NotifyResult<()> {
        tracing::info!(target: "escrowbot::admin", actions = actions.len(), "{}", text);
        Ok(())
    }
}

/// Notifier that records everything it is asked to send
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Messages delivered to one chat
    pub fn for_chat(&self, chat: ChatId) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.recipient == Recipient::Chat(chat))
            .cloned()
            .collect()
    }

    /// Messages delivered to the operator channel
    pub fn admin(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.recipient == Recipient::Admin)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl NotificationPort for MemoryNotifier {
    fn name(&self) -> &'static str {
        "Memory"
    }

    async fn notify(&self, chat: ChatId, text: &str, actions: &[ActionButton]) -> NotifyResult<()> {
        self.sent
            .lock()
            .push(Notification::chat(chat, text).with_actions(actions.to_vec()));
        Ok(())
    }

    async fn notify_admin(&self, text: &str, actions: &[ActionButton]) -> NotifyResult<()> {
        self.sent
            .lock()
            .push(Notification::admin(text).with_actions(actions.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl NotificationPort for FailingNotifier {
        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn notify(&self, _: ChatId, _: &str, _: &[ActionButton]) -> NotifyResult<()> {
            Err(NotifyError::Delivery("offline".to_string()))
        }

        async fn notify_admin(&self, _: &str, _: &[ActionButton]) -> NotifyResult<()> {
            Err(NotifyError::Delivery("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_deliver_routes_by_recipient() {
        let notifier = MemoryNotifier::new();
        let ticket_id = TicketId::generate();
        let batch = vec![
            Notification::chat(ChatId(-5), "hello group")
                .with_actions(vec![ActionButton::new("Cancel", &ticket_id, Action::Cancel)]),
            Notification::admin("hello ops"),
        ];

        deliver(&notifier, &batch).await;

        assert_eq!(notifier.sent(), batch);
        assert_eq!(notifier.for_chat(ChatId(-5)).len(), 1);
        assert_eq!(notifier.admin()[0].text, "hello ops");
    }

    #[tokio::test]
    async fn test_deliver_swallows_failures() {
        deliver(&FailingNotifier, &[Notification::admin("lost")]).await;
    }
}
