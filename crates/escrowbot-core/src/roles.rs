//! Buyer and seller seat binding

use escrowbot_types::{EscrowError, EscrowTicket, Result, Role, TicketStatus};

use crate::command::Actor;
use crate::machine::{invalid_state, TradeEvent};
use crate::registry::TicketRegistry;

/// Binds users to the buyer and seller seats of a ticket
///
/// Seats are filled first-come-first-served and never change afterwards.
/// Once both are filled the ticket moves to crypto selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleBinder;

impl RoleBinder {
    pub fn join_buyer(
        &self,
        registry: &TicketRegistry,
        ticket: &mut EscrowTicket,
        actor: Actor,
        username: Option<&str>,
    ) -> Result<Vec<TradeEvent>> {
        self.join(registry, ticket, actor, Role::Buyer, username)
    }

    pub fn join_seller(
        &self,
        registry: &TicketRegistry,
        ticket: &mut EscrowTicket,
        actor: Actor,
        username: Option<&str>,
    ) -> Result<Vec<TradeEvent>> {
        self.join(registry, ticket, actor, Role::Seller, username)
    }

    fn join(
        &self,
        registry: &TicketRegistry,
        ticket: &mut EscrowTicket,
        actor: Actor,
        role: Role,
        username: Option<&str>,
    ) -> Result<Vec<TradeEvent>> {
        let action = match role {
            Role::Buyer => "join as buyer",
            _ => "join as seller",
        };
        if ticket.status != TicketStatus::Created {
            return Err(invalid_state(ticket, action));
        }
        let user = actor
            .user()
            .ok_or_else(|| EscrowError::unauthorized(action, "user"))?;

        let (seat, other) = match role {
            Role::Buyer => (ticket.buyer_id, ticket.seller_id),
            _ => (ticket.seller_id, ticket.buyer_id),
        };
        if seat.is_some() {
            return Err(EscrowError::SeatTaken {
                ticket_id: ticket.id.to_string(),
                role,
            });
        }
        if other == Some(user) {
            return Err(EscrowError::SameParticipant { user_id: user });
        }

        registry.bind_user(user, &ticket.id)?;
        let handle = normalize_handle(username);
        match role {
            Role::Buyer => {
                ticket.buyer_id = Some(user);
                ticket.buyer_username = handle;
            }
            _ => {
                ticket.seller_id = Some(user);
                ticket.seller_username = handle;
            }
        }

        let mut events = vec![TradeEvent::Joined { user, role }];
        if ticket.both_joined() {
            ticket.advance(TicketStatus::CryptoSelection);
            events.push(TradeEvent::TradeStarted);
        }
        Ok(events)
    }
}

/// Strip whitespace and a leading `@`; blank handles are dropped
fn normalize_handle(username: Option<&str>) -> Option<String> {
    username
        .map(|name| name.trim().trim_start_matches('@'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
