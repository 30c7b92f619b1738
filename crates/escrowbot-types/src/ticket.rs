//! Escrow ticket types
//!
//! A ticket is a single escrow trade between one buyer and one seller inside
//! a chat. The ticket only records declared state; funds move outside the
//! system.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ChatId, CryptoSymbol, TicketId, UserId};

/// Workflow status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Waiting for buyer and seller to join
    Created,
    /// Both joined, buyer picks the crypto leg
    CryptoSelection,
    /// Buyer types the fiat amount
    AwaitingAmount,
    /// Buyer sends crypto to the escrow deposit address
    AwaitingPayment,
    /// Buyer declared payment, admin verifies
    AwaitingAdminConfirmation,
    /// Admin confirmed receipt of funds, seller ships
    PaymentConfirmed,
    /// Seller marked goods sent, buyer confirms receipt
    AwaitingBuyerAction,
    /// Buyer confirmed receipt, seller submits payout wallet
    AwaitingSellerWallet,
    /// Admin pays out manually and releases
    AwaitingAdminRelease,
    /// Trade settled
    Completed,
    /// Trade abandoned before payment
    Cancelled,
    /// Frozen pending manual arbitration
    Disputed,
}

impl TicketStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Check if the trade can still be abandoned
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::CryptoSelection | Self::AwaitingAmount
        )
    }

    /// Check if a dispute may be opened from this state
    pub fn is_disputable(&self) -> bool {
        matches!(
            self,
            Self::Created
                | Self::CryptoSelection
                | Self::AwaitingAmount
                | Self::AwaitingPayment
                | Self::AwaitingAdminConfirmation
                | Self::PaymentConfirmed
                | Self::AwaitingBuyerAction
                | Self::AwaitingSellerWallet
                | Self::AwaitingAdminRelease
        )
    }

    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::CryptoSelection => "crypto_selection",
            Self::AwaitingAmount => "awaiting_amount",
            Self::AwaitingPayment => "awaiting_payment",
            Self::AwaitingAdminConfirmation => "awaiting_admin_confirmation",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::AwaitingBuyerAction => "awaiting_buyer_action",
            Self::AwaitingSellerWallet => "awaiting_seller_wallet",
            Self::AwaitingAdminRelease => "awaiting_admin_release",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a participant or operator plays on a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buyer => f.write_str("buyer"),
            Self::Seller => f.write_str("seller"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// Workflow milestones recorded independently of the status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFlags {
    /// Buyer declared the payment sent
    pub buyer_confirmed: bool,
    /// Seller submitted a payout wallet
    pub seller_confirmed: bool,
    /// Seller marked goods sent
    pub goods_sent: bool,
    /// Buyer confirmed goods received
    pub goods_received: bool,
    /// A dispute is open
    pub disputed: bool,
}

/// Fee split of the fiat leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Escrow fee retained
    pub fee: Decimal,
    /// Amount owed to the seller
    pub payout: Decimal,
}

/// How an arbitrator closes a dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    /// Pay the seller out and complete the trade
    ReleaseToSeller,
    /// Return funds to the buyer and cancel the trade
    RefundBuyer,
    /// Unfreeze and continue from the status the dispute interrupted
    Resume,
}

/// A single escrow trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTicket {
    /// Unique ticket code
    pub id: TicketId,
    /// Chat the ticket belongs to
    pub origin_chat: ChatId,
    /// Buyer, set at most once
    pub buyer_id: Option<UserId>,
    /// Seller, set at most once
    pub seller_id: Option<UserId>,
    /// Buyer's chat handle, if the transport supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_username: Option<String>,
    /// Current workflow status
    pub status: TicketStatus,
    /// Crypto leg, set during crypto selection
    pub crypto_symbol: Option<CryptoSymbol>,
    /// Fiat leg, set together with `crypto_amount`
    pub fiat_amount: Option<Decimal>,
    /// Crypto leg amount at the quoted price
    pub crypto_amount: Option<Decimal>,
    /// Unit price the crypto leg was fixed at
    pub quoted_price: Option<Decimal>,
    /// Seller's payout wallet
    pub payout_wallet_address: Option<String>,
    /// Fee split computed when the wallet is submitted
    pub settlement: Option<Settlement>,
    /// Workflow milestones
    pub flags: TicketFlags,
    /// Status the ticket was in when the dispute froze it
    pub disputed_from: Option<TicketStatus>,
    /// When the ticket was created
    pub created_at: DateTime<Utc>,
    /// When the ticket last changed
    pub updated_at: DateTime<Utc>,
}

impl EscrowTicket {
    /// Create an empty ticket in the initial status
    pub fn new(id: TicketId, origin_chat: ChatId) -> Self {
        let now = Utc::now();
        Self {
            id,
            origin_chat,
            buyer_id: None,
            seller_id: None,
            buyer_username: None,
            seller_username: None,
            status: TicketStatus::Created,
            crypto_symbol: None,
            fiat_amount: None,
            crypto_amount: None,
            quoted_price: None,
            payout_wallet_address: None,
            settlement: None,
            flags: TicketFlags::default(),
            disputed_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Role the user holds on this ticket, if any
    pub fn role_of(&self, user: UserId) -> Option<Role> {
        if self.buyer_id == Some(user) {
            Some(Role::Buyer)
        } else if self.seller_id == Some(user) {
            Some(Role::Seller)
        } else {
            None
        }
    }

    /// Check if the user is bound as buyer or seller
    pub fn is_participant(&self, user: UserId) -> bool {
        self.role_of(user).is_some()
    }

    /// Check if both seats are filled
    pub fn both_joined(&self) -> bool {
        self.buyer_id.is_some() && self.seller_id.is_some()
    }

    /// Bound participants, buyer first
    pub fn participants(&self) -> Vec<UserId> {
        self.buyer_id.into_iter().chain(self.seller_id).collect()
    }

    /// How a participant is named in chat messages
    ///
    /// `@handle` when the seat holder supplied one, otherwise `user <id>`.
    pub fn display_name(&self, user: UserId) -> String {
        let handle = match self.role_of(user) {
            Some(Role::Buyer) => self.buyer_username.as_deref(),
            Some(Role::Seller) => self.seller_username.as_deref(),
            _ => None,
        };
        match handle {
            Some(handle) => format!("@{}", handle),
            None => format!("user {}", user),
        }
    }

    /// Move to a new status and stamp the update time
    pub fn advance(&mut self, status: TicketStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
