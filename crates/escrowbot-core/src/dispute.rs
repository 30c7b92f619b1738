//! Dispute handling
//!
//! A dispute freezes the ticket: every workflow command is rejected until an
//! admin resolves it. Raising notifies the group and the operator channel
//! with everything an arbiter needs to decide.

use std::sync::Arc;

use escrowbot_types::{
    format_crypto, DisputeOutcome, EscrowError, EscrowTicket, Result, TicketStatus,
};

use crate::command::{Action, Actor};
use crate::config::EscrowConfig;
use crate::machine::{invalid_state, require_admin, TradeEvent};
use crate::messages::{describe_user, fiat};
use crate::notify::{ActionButton, Notification};

/// Raises and resolves disputes on locked tickets
#[derive(Debug, Clone)]
pub struct DisputeManager {
    config: Arc<EscrowConfig>,
}

impl DisputeManager {
    pub fn new(config: Arc<EscrowConfig>) -> Self {
        Self { config }
    }

    /// Freeze the ticket
    ///
    /// Participants may dispute from any in-flight status. The system actor
    /// may only dispute a ticket waiting on the buyer after goods were sent.
    pub fn raise(&self, ticket: &mut EscrowTicket, actor: Actor) -> Result<TradeEvent> {
        const ACTION: &str = "raise dispute";
        if ticket.flags.disputed || ticket.status == TicketStatus::Disputed {
            return Err(EscrowError::AlreadyDisputed {
                ticket_id: ticket.id.to_string(),
            });
        }
        if !ticket.status.is_disputable() {
            return Err(invalid_state(ticket, ACTION));
        }
        let allowed = match actor {
            Actor::User(user) => ticket.is_participant(user),
            Actor::System => ticket.status == TicketStatus::AwaitingBuyerAction,
        };
        if !allowed {
            return Err(EscrowError::unauthorized(ACTION, "participant"));
        }

        let from = ticket.status;
        ticket.disputed_from = Some(from);
        ticket.flags.disputed = true;
        ticket.advance(TicketStatus::Disputed);
        Ok(TradeEvent::Disputed { by: actor, from })
    }

    /// Settle a frozen ticket
    pub fn resolve(
        &self,
        ticket: &mut EscrowTicket,
        actor: Actor,
        outcome: DisputeOutcome,
    ) -> Result<TradeEvent> {
        const ACTION: &str = "resolve dispute";
        if ticket.status != TicketStatus::Disputed {
            return Err(invalid_state(ticket, ACTION));
        }
        require_admin(&self.config, actor, ACTION)?;

        match outcome {
            DisputeOutcome::ReleaseToSeller => ticket.advance(TicketStatus::Completed),
            DisputeOutcome::RefundBuyer => ticket.advance(TicketStatus::Cancelled),
            DisputeOutcome::Resume => {
                let previous = ticket
                    .disputed_from
                    .ok_or_else(|| invalid_state(ticket, ACTION))?;
                ticket.flags.disputed = false;
                ticket.disputed_from = None;
                ticket.advance(previous);
            }
        }
        Ok(TradeEvent::DisputeResolved { outcome })
    }

    /// Group and operator messages for a dispute event
    pub fn notifications(&self, event: &TradeEvent, ticket: &EscrowTicket) -> Vec<Notification> {
        match event {
            TradeEvent::Disputed { by, from } => self.raised(ticket, *by, *from),
            TradeEvent::DisputeResolved { outcome } => self.resolved(ticket, *outcome),
            _ => Vec::new(),
        }
    }

    fn raised(&self, ticket: &EscrowTicket, by: Actor, from: TicketStatus) -> Vec<Notification> {
        let group = Notification::chat(
            ticket.origin_chat,
            format!(
                "A dispute has been opened on ticket {} by {}. The trade is frozen until an admin resolves it.",
                ticket.id,
                describe_actor(ticket, by)
            ),
        );

        let amounts = match (ticket.fiat_amount, ticket.crypto_amount, ticket.crypto_symbol) {
            (Some(f), Some(c), Some(symbol)) => format!(
                "{} / {} {}",
                fiat(&self.config, f),
                format_crypto(c),
                symbol
            ),
            _ => "not set".to_string(),
        };
        let mut text = format!(
            "DISPUTE on escrow {}\nGroup: {}\nRaised by: {}\nBuyer: {}\nSeller: {}\nStatus before dispute: {}\nAmount: {}",
            ticket.id,
            ticket.origin_chat,
            describe_actor(ticket, by),
            describe_user(ticket, ticket.buyer_id),
            describe_user(ticket, ticket.seller_id),
            from,
            amounts,
        );
        if let Some(wallet) = &ticket.payout_wallet_address {
            text.push_str(&format!("\nSeller wallet: {}", wallet));
        }

        let admin = Notification::admin(text).with_actions(vec![
            ActionButton::new(
                "Release to seller",
                &ticket.id,
                Action::ResolveDispute {
                    outcome: DisputeOutcome::ReleaseToSeller,
                },
            ),
            ActionButton::new(
                "Refund buyer",
                &ticket.id,
                Action::ResolveDispute {
                    outcome: DisputeOutcome::RefundBuyer,
                },
            ),
            ActionButton::new(
                "Resume trade",
                &ticket.id,
                Action::ResolveDispute {
                    outcome: DisputeOutcome::Resume,
                },
            ),
        ]);

        vec![group, admin]
    }

    fn resolved(&self, ticket: &EscrowTicket, outcome: DisputeOutcome) -> Vec<Notification> {
        let summary = match outcome {
            DisputeOutcome::ReleaseToSeller => "funds released to the seller. The trade is closed.".to_string(),
            DisputeOutcome::RefundBuyer => "the buyer is refunded. The trade is closed.".to_string(),
            DisputeOutcome::Resume => format!("the trade resumes at {}.", ticket.status),
        };
        vec![
            Notification::chat(
                ticket.origin_chat,
                format!("Dispute on ticket {} resolved: {}", ticket.id, summary),
            ),
            Notification::admin(format!("Escrow {}: dispute resolved, {}", ticket.id, summary)),
        ]
    }
}

fn describe_actor(ticket: &EscrowTicket, actor: Actor) -> String {
    match actor {
        Actor::User(user) => match ticket.role_of(user) {
            Some(role) => format!("{} ({})", role, ticket.display_name(user)),
            None => ticket.display_name(user),
        },
        Actor::System => "the bot (buyer did not respond in time)".to_string(),
    }
}
