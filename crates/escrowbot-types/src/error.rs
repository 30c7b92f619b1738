//! Error types for the escrow bot
//!
//! Every rejection is explicit and leaves the ticket untouched.

use thiserror::Error;

use crate::{CryptoSymbol, Role, TicketStatus, UserId};

/// Result type for escrow operations
pub type Result<T> = std::result::Result<T, EscrowError>;

/// Escrow error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================

    /// Ticket unknown or already removed
    #[error("Ticket {ticket} not found")]
    NotFound { ticket: String },

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    /// Actor does not hold the role the transition requires
    #[error("Unauthorized: {action} requires {required}")]
    Unauthorized { action: &'static str, required: String },

    // ========================================================================
    // Workflow Errors
    // ========================================================================

    /// Current status does not permit the transition
    #[error("Ticket {ticket_id} is {status}, cannot {action}")]
    InvalidState {
        ticket_id: String,
        status: TicketStatus,
        action: &'static str,
    },

    /// A dispute is already open
    #[error("Ticket {ticket_id} is already disputed")]
    AlreadyDisputed { ticket_id: String },

    // ========================================================================
    // Role Binding Errors
    // ========================================================================

    /// The requested seat is already filled
    #[error("Ticket {ticket_id} already has a {role}")]
    SeatTaken { ticket_id: String, role: Role },

    /// A user tried to take both seats
    #[error("User {user_id} cannot be both buyer and seller")]
    SameParticipant { user_id: UserId },

    /// The user already has an unresolved trade elsewhere
    #[error("User {user_id} already has an active trade {ticket_id}")]
    ParticipantBusy { user_id: UserId, ticket_id: String },

    // ========================================================================
    // Input Errors
    // ========================================================================

    /// Malformed amount, unsupported symbol, empty address
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Price oracle failed; retry by re-sending the amount
    #[error("Price quote for {symbol} unavailable: {reason}")]
    QuoteUnavailable { symbol: CryptoSymbol, reason: String },
}

impl EscrowError {
    /// Create a not-found error
    pub fn not_found(ticket: impl ToString) -> Self {
        Self::NotFound {
            ticket: ticket.to_string(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(action: &'static str, required: impl Into<String>) -> Self {
        Self::Unauthorized {
            action,
            required: required.into(),
        }
    }

    /// Check if re-issuing the same command may succeed
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::QuoteUnavailable { .. })
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::AlreadyDisputed { .. } => "ALREADY_DISPUTED",
            Self::SeatTaken { .. } => "SEAT_TAKEN",
            Self::SameParticipant { .. } => "SAME_PARTICIPANT",
            Self::ParticipantBusy { .. } => "PARTICIPANT_BUSY",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::QuoteUnavailable { .. } => "QUOTE_UNAVAILABLE",
        }
    }
}
