//! Structured inbound commands
//!
//! The chat transport turns button presses and typed messages into a
//! [`Command`]: who is acting, which ticket, and what they want to do.

use serde::{Deserialize, Serialize};
use std::fmt;

use escrowbot_types::{ChatId, DisputeOutcome, TicketId, UserId};

/// Who issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// A chat participant or operator
    User(UserId),
    /// The bot itself (scheduled tasks); never accepted from the wire
    #[serde(skip_deserializing)]
    System,
}

impl Actor {
    /// The acting user, if a human issued the command
    pub fn user(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::System => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {}", id),
            Self::System => f.write_str("system"),
        }
    }
}

/// How a command addresses its ticket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketRef {
    /// By ticket code
    Id(TicketId),
    /// By the chat's live ticket
    Chat(ChatId),
}

impl From<TicketId> for TicketRef {
    fn from(id: TicketId) -> Self {
        Self::Id(id)
    }
}

impl From<ChatId> for TicketRef {
    fn from(chat: ChatId) -> Self {
        Self::Chat(chat)
    }
}

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Chat(chat) => write!(f, "chat {}", chat),
        }
    }
}

/// What the actor wants to do
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    JoinBuyer,
    JoinSeller,
    SelectCrypto { symbol: String },
    /// Free-text fiat amount as typed by the buyer
    SetAmount { amount: String },
    MarkPaid,
    AdminDecision { approved: bool },
    SellerMarkSent,
    BuyerConfirmReceipt,
    SubmitWallet { address: String },
    AdminRelease,
    Cancel,
    RaiseDispute,
    ResolveDispute { outcome: DisputeOutcome },
}

impl Action {
    /// Short verb phrase used in logs and rejection messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinBuyer => "join as buyer",
            Self::JoinSeller => "join as seller",
            Self::SelectCrypto { .. } => "select crypto",
            Self::SetAmount { .. } => "set amount",
            Self::MarkPaid => "mark paid",
            Self::AdminDecision { .. } => "confirm payment",
            Self::SellerMarkSent => "mark goods sent",
            Self::BuyerConfirmReceipt => "confirm receipt",
            Self::SubmitWallet { .. } => "submit wallet",
            Self::AdminRelease => "release funds",
            Self::Cancel => "cancel",
            Self::RaiseDispute => "raise dispute",
            Self::ResolveDispute { .. } => "resolve dispute",
        }
    }
}

/// A single inbound command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub ticket: TicketRef,
    pub actor: Actor,
    pub action: Action,
    /// Chat handle of the acting user, recorded when they take a seat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Command {
    pub fn new(ticket: impl Into<TicketRef>, actor: Actor, action: Action) -> Self {
        Self {
            ticket: ticket.into(),
            actor,
            action,
            username: None,
        }
    }

    /// Attach the actor's chat handle
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Command issued by a human user
    pub fn by_user(ticket: impl Into<TicketRef>, user: UserId, action: Action) -> Self {
        Self::new(ticket, Actor::User(user), action)
    }
}
