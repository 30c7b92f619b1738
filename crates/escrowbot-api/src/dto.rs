//! Response bodies

use serde::{Deserialize, Serialize};

use escrowbot_core::ActionButton;
use escrowbot_types::EscrowTicket;

/// A ticket together with the actions valid in its current status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketView {
    pub ticket: EscrowTicket,
    pub actions: Vec<ActionButton>,
}

/// Welcome message for the transport's start command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub text: String,
}
