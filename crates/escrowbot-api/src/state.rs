//! Application state shared across handlers

use escrowbot_core::EscrowDesk;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The escrow desk every handler drives
    pub desk: EscrowDesk,
}

impl AppState {
    pub fn new(desk: EscrowDesk) -> Self {
        Self { desk }
    }
}
