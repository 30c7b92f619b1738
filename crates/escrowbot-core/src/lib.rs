//! Escrow Bot Core - Trade state machine for chat-hosted escrow
//!
//! This crate implements the escrow workflow between a buyer and a seller
//! inside a group chat, with admins verifying payments out of band:
//! - TicketRegistry: live tickets, one per chat, serialized per ticket
//! - RoleBinder: first-come-first-served buyer and seller seats
//! - TradeStateMachine: guarded transitions from crypto selection to release
//! - DisputeManager: freezes a trade and hands it to an admin
//! - EscrowDesk: resolves commands, runs them, delivers notifications
//!
//! # Invariants
//!
//! 1. A rejected command leaves the ticket untouched and notifies no one
//! 2. Buyer and seller are distinct and never change once bound
//! 3. The fiat and crypto legs are fixed together at one quoted price
//! 4. A disputed ticket only accepts a resolution from an admin
//! 5. Completed and cancelled tickets leave the registry

pub mod command;
pub mod config;
pub mod desk;
pub mod dispute;
pub mod machine;
pub mod messages;
pub mod notify;
pub mod registry;
pub mod roles;
pub mod timer;

pub use command::*;
pub use config::*;
pub use desk::*;
pub use dispute::*;
pub use machine::*;
pub use messages::{available_actions, render, ticket_prompt, welcome_text};
pub use notify::*;
pub use registry::*;
pub use roles::*;
pub use timer::*;
