//! Escrow bot types - canonical domain types for chat-mediated P2P trades
//!
//! This crate contains all foundational types with zero dependencies on other
//! escrowbot crates. It defines:
//!
//! - Identity types (TicketId, ChatId, UserId)
//! - The supported crypto catalogue and fiat currencies
//! - Fiat/crypto amount parsing and 8-decimal rounding
//! - The `EscrowTicket` entity and its `TicketStatus` workflow
//! - The error taxonomy shared by every command
//!
//! # Workflow
//!
//! ```text
//! created → crypto_selection → awaiting_amount → awaiting_payment
//!   → awaiting_admin_confirmation → payment_confirmed → awaiting_buyer_action
//!   → awaiting_seller_wallet → awaiting_admin_release → completed
//! ```
//!
//! `cancelled` is reachable from the first three states, `disputed` from any
//! non-terminal state.

pub mod identity;
pub mod currency;
pub mod amount;
pub mod ticket;
pub mod error;

pub use identity::*;
pub use currency::*;
pub use amount::*;
pub use ticket::*;
pub use error::*;

/// Version of the escrow types schema
pub const TYPES_VERSION: &str = "0.1.0";
