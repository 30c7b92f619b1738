//! Trade state machine
//!
//! Guards and applies the workflow transitions on a locked ticket. Every
//! operation validates all preconditions before it touches the ticket, so a
//! rejected command leaves it exactly as it was.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use escrowbot_fees::FeeCalculator;
use escrowbot_types::{
    crypto_amount, parse_fiat_amount, CryptoSymbol, DisputeOutcome, EscrowError, EscrowTicket,
    Result, Role, Settlement, TicketStatus, UserId,
};

use crate::command::Actor;
use crate::config::EscrowConfig;

/// What an accepted command did to a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TradeEvent {
    Joined { user: UserId, role: Role },
    TradeStarted,
    CryptoSelected { symbol: CryptoSymbol },
    AmountSet {
        fiat_amount: Decimal,
        crypto_amount: Decimal,
        price: Decimal,
    },
    PaymentDeclared,
    PaymentConfirmed,
    PaymentRejected,
    GoodsSent,
    ReceiptConfirmed,
    WalletSubmitted { settlement: Settlement },
    Released,
    Cancelled { by: Actor },
    Disputed { by: Actor, from: TicketStatus },
    DisputeResolved { outcome: DisputeOutcome },
}

/// Amount request validated before the price is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRequest {
    pub symbol: CryptoSymbol,
    pub fiat_amount: Decimal,
}

/// Reject unless the ticket is in `expected`
pub(crate) fn require_status(
    ticket: &EscrowTicket,
    expected: TicketStatus,
    action: &'static str,
) -> Result<()> {
    if ticket.status == expected {
        Ok(())
    } else {
        Err(invalid_state(ticket, action))
    }
}

pub(crate) fn invalid_state(ticket: &EscrowTicket, action: &'static str) -> EscrowError {
    EscrowError::InvalidState {
        ticket_id: ticket.id.to_string(),
        status: ticket.status,
        action,
    }
}

/// Reject unless the actor holds `role` on the ticket
pub(crate) fn require_role(
    ticket: &EscrowTicket,
    actor: Actor,
    role: Role,
    action: &'static str,
) -> Result<UserId> {
    match actor.user() {
        Some(user) if ticket.role_of(user) == Some(role) => Ok(user),
        _ => Err(EscrowError::unauthorized(action, role.to_string())),
    }
}

/// Reject unless the actor is a configured admin
pub(crate) fn require_admin(
    config: &EscrowConfig,
    actor: Actor,
    action: &'static str,
) -> Result<UserId> {
    match actor.user() {
        Some(user) if config.is_admin(user) => Ok(user),
        _ => Err(EscrowError::unauthorized(action, Role::Admin.to_string())),
    }
}

/// Workflow transitions after both parties have joined
#[derive(Debug, Clone)]
pub struct TradeStateMachine {
    config: Arc<EscrowConfig>,
    fees: FeeCalculator,
}

impl TradeStateMachine {
    pub fn new(config: Arc<EscrowConfig>, fees: FeeCalculator) -> Self {
        Self { config, fees }
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    /// Buyer picks the crypto leg
    pub fn select_crypto(
        &self,
        ticket: &mut EscrowTicket,
        actor: Actor,
        symbol: &str,
    ) -> Result<TradeEvent> {
        const ACTION: &str = "select crypto";
        require_status(ticket, TicketStatus::CryptoSelection, ACTION)?;
        require_role(ticket, actor, Role::Buyer, ACTION)?;

        let symbol: CryptoSymbol = symbol
            .parse()
            .map_err(|e: escrowbot_types::UnknownSymbol| EscrowError::invalid_input("symbol", e.to_string()))?;
        if !self.config.supports(symbol) {
            return Err(EscrowError::invalid_input(
                "symbol",
                format!("{} is not offered", symbol),
            ));
        }

        ticket.crypto_symbol = Some(symbol);
        ticket.advance(TicketStatus::AwaitingAmount);
        Ok(TradeEvent::CryptoSelected { symbol })
    }

    /// Validate an amount message before quoting
    pub fn prepare_amount(
        &self,
        ticket: &EscrowTicket,
        actor: Actor,
        text: &str,
    ) -> Result<AmountRequest> {
        const ACTION: &str = "set amount";
        require_status(ticket, TicketStatus::AwaitingAmount, ACTION)?;
        require_role(ticket, actor, Role::Buyer, ACTION)?;
        let symbol = ticket
            .crypto_symbol
            .ok_or_else(|| invalid_state(ticket, ACTION))?;
        let fiat_amount = parse_fiat_amount(text)?;
        Ok(AmountRequest {
            symbol,
            fiat_amount,
        })
    }

    /// Fix both legs at the quoted price
    pub fn apply_amount(
        &self,
        ticket: &mut EscrowTicket,
        request: AmountRequest,
        price: Decimal,
    ) -> Result<TradeEvent> {
        require_status(ticket, TicketStatus::AwaitingAmount, "set amount")?;
        let crypto = crypto_amount(request.fiat_amount, price)?;

        ticket.fiat_amount = Some(request.fiat_amount);
        ticket.crypto_amount = Some(crypto);
        ticket.quoted_price = Some(price);
        ticket.advance(TicketStatus::AwaitingPayment);
        Ok(TradeEvent::AmountSet {
            fiat_amount: request.fiat_amount,
            crypto_amount: crypto,
            price,
        })
    }

    /// Buyer declares the deposit sent
    pub fn mark_paid(&self, ticket: &mut EscrowTicket, actor: Actor) -> Result<TradeEvent> {
        const ACTION: &str = "mark paid";
        require_status(ticket, TicketStatus::AwaitingPayment, ACTION)?;
        require_role(ticket, actor, Role::Buyer, ACTION)?;

        ticket.flags.buyer_confirmed = true;
        ticket.advance(TicketStatus::AwaitingAdminConfirmation);
        Ok(TradeEvent::PaymentDeclared)
    }

    /// Admin confirms or rejects receipt of the deposit
    pub fn admin_decision(
        &self,
        ticket: &mut EscrowTicket,
        actor: Actor,
        approved: bool,
    ) -> Result<TradeEvent> {
        const ACTION: &str = "confirm payment";
        require_status(ticket, TicketStatus::AwaitingAdminConfirmation, ACTION)?;
        require_admin(&self.config, actor, ACTION)?;

        if approved {
            ticket.advance(TicketStatus::PaymentConfirmed);
            Ok(TradeEvent::PaymentConfirmed)
        } else {
            ticket.flags.buyer_confirmed = false;
            ticket.advance(TicketStatus::AwaitingPayment);
            Ok(TradeEvent::PaymentRejected)
        }
    }

    /// Seller declares the goods shipped
    pub fn seller_mark_sent(&self, ticket: &mut EscrowTicket, actor: Actor) -> Result<TradeEvent> {
        const ACTION: &str = "mark goods sent";
        require_status(ticket, TicketStatus::PaymentConfirmed, ACTION)?;
        require_role(ticket, actor, Role::Seller, ACTION)?;

        ticket.flags.goods_sent = true;
        ticket.advance(TicketStatus::AwaitingBuyerAction);
        Ok(TradeEvent::GoodsSent)
    }

    /// Buyer confirms the goods arrived
    pub fn buyer_confirm_receipt(
        &self,
        ticket: &mut EscrowTicket,
        actor: Actor,
    ) -> Result<TradeEvent> {
        const ACTION: &str = "confirm receipt";
        require_status(ticket, TicketStatus::AwaitingBuyerAction, ACTION)?;
        require_role(ticket, actor, Role::Buyer, ACTION)?;

        ticket.flags.goods_received = true;
        ticket.advance(TicketStatus::AwaitingSellerWallet);
        Ok(TradeEvent::ReceiptConfirmed)
    }

    /// Seller submits the payout wallet; the fee split is fixed here
    pub fn submit_wallet(
        &self,
        ticket: &mut EscrowTicket,
        actor: Actor,
        address: &str,
    ) -> Result<TradeEvent> {
        const ACTION: &str = "submit wallet";
        require_status(ticket, TicketStatus::AwaitingSellerWallet, ACTION)?;
        require_role(ticket, actor, Role::Seller, ACTION)?;

        let address = address.trim();
        if address.is_empty() {
            return Err(EscrowError::invalid_input("address", "wallet address is empty"));
        }
        let fiat = ticket
            .fiat_amount
            .ok_or_else(|| invalid_state(ticket, ACTION))?;
        let settlement = self.fees.settle(fiat);

        ticket.payout_wallet_address = Some(address.to_string());
        ticket.settlement = Some(settlement);
        ticket.flags.seller_confirmed = true;
        ticket.advance(TicketStatus::AwaitingAdminRelease);
        Ok(TradeEvent::WalletSubmitted { settlement })
    }

    /// Admin has paid the seller out and closes the trade
    pub fn admin_release(&self, ticket: &mut EscrowTicket, actor: Actor) -> Result<TradeEvent> {
        const ACTION: &str = "release funds";
        require_status(ticket, TicketStatus::AwaitingAdminRelease, ACTION)?;
        require_admin(&self.config, actor, ACTION)?;

        ticket.advance(TicketStatus::Completed);
        Ok(TradeEvent::Released)
    }

    /// A participant abandons the trade before payment
    pub fn cancel(&self, ticket: &mut EscrowTicket, actor: Actor) -> Result<TradeEvent> {
        const ACTION: &str = "cancel";
        if !ticket.status.is_cancellable() {
            return Err(invalid_state(ticket, ACTION));
        }
        match actor.user() {
            Some(user) if ticket.is_participant(user) => {}
            _ => return Err(EscrowError::unauthorized(ACTION, "participant")),
        }

        ticket.advance(TicketStatus::Cancelled);
        Ok(TradeEvent::Cancelled { by: actor })
    }
}
