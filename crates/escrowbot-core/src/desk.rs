//! Escrow desk
//!
//! Entry point for the chat transport. Resolves the addressed ticket, runs
//! the command under the ticket's lock, then delivers the rendered
//! notifications once the lock is released.

use std::sync::Arc;

use escrowbot_fees::FeeCalculator;
use escrowbot_quotes::PriceQuotePort;
use escrowbot_types::{ChatId, EscrowError, EscrowTicket, Result, TicketId, TicketStatus, UserId};

use crate::command::{Action, Actor, Command, TicketRef};
use crate::config::{ConfigError, EscrowConfig};
use crate::dispute::DisputeManager;
use crate::machine::{TradeEvent, TradeStateMachine};
use crate::messages;
use crate::notify::{self, ActionButton, Notification, NotificationPort};
use crate::registry::TicketRegistry;
use crate::roles::RoleBinder;
use crate::timer::AutoDisputeTimers;

struct DeskInner {
    config: Arc<EscrowConfig>,
    registry: TicketRegistry,
    roles: RoleBinder,
    machine: TradeStateMachine,
    disputes: DisputeManager,
    quotes: Arc<dyn PriceQuotePort>,
    notifier: Arc<dyn NotificationPort>,
    timers: AutoDisputeTimers,
}

/// The escrow desk: ticket registry plus trade workflow
#[derive(Clone)]
pub struct EscrowDesk {
    inner: Arc<DeskInner>,
}

impl EscrowDesk {
    pub fn new(
        config: EscrowConfig,
        quotes: Arc<dyn PriceQuotePort>,
        notifier: Arc<dyn NotificationPort>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let fees = FeeCalculator::new(config.fee_rate)?;
        let config = Arc::new(config);

        tracing::info!(
            fee_rate = %config.fee_rate,
            fiat = %config.fiat_currency,
            quotes = quotes.name(),
            notifier = notifier.name(),
            admins = config.admins.len(),
            "Escrow desk ready"
        );

        Ok(Self {
            inner: Arc::new(DeskInner {
                registry: TicketRegistry::new(),
                roles: RoleBinder,
                machine: TradeStateMachine::new(config.clone(), fees),
                disputes: DisputeManager::new(config.clone()),
                quotes,
                notifier,
                timers: AutoDisputeTimers::new(),
                config,
            }),
        })
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.inner.config
    }

    /// Open the chat's ticket, or return the one already live
    ///
    /// A fresh ticket posts the role prompt to the chat.
    pub async fn open_ticket(&self, chat: ChatId) -> EscrowTicket {
        loop {
            let (handle, created) = self.inner.registry.open(chat);
            let ticket = handle.lock().await.clone();
            // Closed between lookup and lock; its indices are already gone
            if ticket.status.is_terminal() {
                continue;
            }
            if created {
                tracing::info!(ticket_id = %ticket.id, chat_id = %chat, "Ticket opened");
                notify::deliver(
                    self.inner.notifier.as_ref(),
                    &[messages::ticket_prompt(&ticket)],
                )
                .await;
            }
            return ticket;
        }
    }

    /// Snapshot of a live ticket
    pub async fn ticket(&self, reference: &TicketRef) -> Result<EscrowTicket> {
        let id = self.resolve(reference)?;
        self.inner.registry.snapshot(&id).await
    }

    /// The unresolved trade a user is bound to
    pub async fn active_ticket_for(&self, user: UserId) -> Option<EscrowTicket> {
        let id = self.inner.registry.active_ticket_for(user)?;
        self.inner.registry.snapshot(&id).await.ok()
    }

    /// Buttons valid for the ticket as it stands
    pub fn available_actions(&self, ticket: &EscrowTicket) -> Vec<ActionButton> {
        messages::available_actions(ticket, &self.inner.config)
    }

    /// Number of live tickets
    pub fn live_tickets(&self) -> usize {
        self.inner.registry.len()
    }

    /// Check if an auto-dispute timer is pending for a ticket
    pub fn auto_dispute_armed(&self, ticket_id: &TicketId) -> bool {
        self.inner.timers.is_armed(ticket_id)
    }

    /// Run a command and return the ticket as it stands afterwards
    ///
    /// Rejected commands change nothing and notify no one.
    pub async fn execute(&self, command: Command) -> Result<EscrowTicket> {
        let inner = &self.inner;
        let ticket_id = self.resolve(&command.ticket)?;
        let handle = inner.registry.get(&ticket_id)?;

        let (snapshot, notifications) = {
            let mut ticket = handle.lock().await;
            if ticket.status.is_terminal() {
                return Err(EscrowError::not_found(&ticket_id));
            }

            let from = ticket.status;
            let events = match self.apply(&mut ticket, &command).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::debug!(
                        ticket_id = %ticket_id,
                        actor = %command.actor,
                        action = command.action.name(),
                        status = %from,
                        error = %e,
                        "Command rejected"
                    );
                    return Err(e);
                }
            };

            tracing::info!(
                ticket_id = %ticket_id,
                actor = %command.actor,
                action = command.action.name(),
                from = %from,
                to = %ticket.status,
                "Ticket transition"
            );

            self.sync_timers(&ticket, &events);
            if ticket.status.is_terminal() {
                inner.registry.remove(&ticket);
                tracing::info!(ticket_id = %ticket_id, status = %ticket.status, "Ticket closed");
            }

            let notifications: Vec<Notification> = events
                .iter()
                .flat_map(|event| self.render(event, &ticket))
                .collect();
            (ticket.clone(), notifications)
        };

        notify::deliver(inner.notifier.as_ref(), &notifications).await;
        Ok(snapshot)
    }

    fn resolve(&self, reference: &TicketRef) -> Result<TicketId> {
        match reference {
            TicketRef::Id(id) => Ok(id.clone()),
            TicketRef::Chat(chat) => self
                .inner
                .registry
                .find_by_chat(*chat)
                .ok_or_else(|| EscrowError::not_found(reference)),
        }
    }

    async fn apply(&self, ticket: &mut EscrowTicket, command: &Command) -> Result<Vec<TradeEvent>> {
        let inner = &self.inner;
        let actor = command.actor;
        let machine = &inner.machine;
        let username = command.username.as_deref();

        let event = match &command.action {
            Action::JoinBuyer => {
                return inner.roles.join_buyer(&inner.registry, ticket, actor, username)
            }
            Action::JoinSeller => {
                return inner.roles.join_seller(&inner.registry, ticket, actor, username)
            }
            Action::SelectCrypto { symbol } => machine.select_crypto(ticket, actor, symbol)?,
            Action::SetAmount { amount } => {
                let request = machine.prepare_amount(ticket, actor, amount)?;
                let price = inner
                    .quotes
                    .quote(request.symbol, inner.config.fiat_currency)
                    .await
                    .map_err(|e| {
                        tracing::warn!(
                            ticket_id = %ticket.id,
                            symbol = %request.symbol,
                            source = inner.quotes.name(),
                            error = %e,
                            "Price quote failed"
                        );
                        EscrowError::QuoteUnavailable {
                            symbol: request.symbol,
                            reason: e.to_string(),
                        }
                    })?;
                machine.apply_amount(ticket, request, price)?
            }
            Action::MarkPaid => machine.mark_paid(ticket, actor)?,
            Action::AdminDecision { approved } => machine.admin_decision(ticket, actor, *approved)?,
            Action::SellerMarkSent => machine.seller_mark_sent(ticket, actor)?,
            Action::BuyerConfirmReceipt => machine.buyer_confirm_receipt(ticket, actor)?,
            Action::SubmitWallet { address } => machine.submit_wallet(ticket, actor, address)?,
            Action::AdminRelease => machine.admin_release(ticket, actor)?,
            Action::Cancel => machine.cancel(ticket, actor)?,
            Action::RaiseDispute => inner.disputes.raise(ticket, actor)?,
            Action::ResolveDispute { outcome } => inner.disputes.resolve(ticket, actor, *outcome)?,
        };
        Ok(vec![event])
    }

    fn render(&self, event: &TradeEvent, ticket: &EscrowTicket) -> Vec<Notification> {
        match event {
            TradeEvent::Disputed { .. } | TradeEvent::DisputeResolved { .. } => {
                self.inner.disputes.notifications(event, ticket)
            }
            _ => messages::render(event, ticket, &self.inner.config),
        }
    }

    fn sync_timers(&self, ticket: &EscrowTicket, events: &[TradeEvent]) {
        if ticket.status.is_terminal() {
            self.inner.timers.cancel(&ticket.id);
            return;
        }
        for event in events {
            match event {
                TradeEvent::GoodsSent => self.arm_auto_dispute(&ticket.id),
                TradeEvent::DisputeResolved { .. }
                    if ticket.status == TicketStatus::AwaitingBuyerAction =>
                {
                    self.arm_auto_dispute(&ticket.id)
                }
                TradeEvent::ReceiptConfirmed | TradeEvent::Disputed { .. } => {
                    self.inner.timers.cancel(&ticket.id);
                }
                _ => {}
            }
        }
    }

    fn arm_auto_dispute(&self, ticket_id: &TicketId) {
        let Some(delay) = self.inner.config.auto_dispute_after() else {
            return;
        };
        let desk = Arc::downgrade(&self.inner);
        let id = ticket_id.clone();
        self.inner.timers.schedule(ticket_id.clone(), delay, async move {
            let Some(inner) = desk.upgrade() else {
                return;
            };
            let desk = EscrowDesk { inner };
            let command = Command::new(id.clone(), Actor::System, Action::RaiseDispute);
            match desk.execute(command).await {
                Ok(_) => tracing::info!(ticket_id = %id, "Buyer silent, dispute raised automatically"),
                Err(e) => tracing::debug!(ticket_id = %id, error = %e, "Auto-dispute skipped"),
            }
        });
        tracing::debug!(ticket_id = %ticket_id, delay_secs = delay.as_secs(), "Auto-dispute armed");
    }
}
