//! Chat message templates
//!
//! Renders the group and operator messages for each accepted transition.
//! Every group message carries exactly the buttons that are valid in the
//! ticket's new status.

use rust_decimal::Decimal;

use escrowbot_types::{format_crypto, DisputeOutcome, EscrowTicket, Role, TicketStatus, UserId};

use crate::command::Action;
use crate::config::EscrowConfig;
use crate::machine::TradeEvent;
use crate::notify::{ActionButton, Notification};

/// Greeting shown to anyone who starts the bot outside a trade
pub fn welcome_text() -> &'static str {
    "Thank you for using the Escrow Bot!\n\n\
     Add this bot into a group with the Buyer and Seller, then type /escrow to start a trade."
}

pub(crate) fn describe_user(ticket: &EscrowTicket, user: Option<UserId>) -> String {
    match user {
        Some(user) => ticket.display_name(user),
        None => "-".to_string(),
    }
}

pub(crate) fn fiat(config: &EscrowConfig, amount: Decimal) -> String {
    format!("{}{}", config.fiat_currency.sign(), amount)
}

/// Role prompt posted when a chat opens a ticket
pub fn ticket_prompt(ticket: &EscrowTicket) -> Notification {
    Notification::chat(
        ticket.origin_chat,
        format!("Escrow ticket {} opened. Select your role to start escrow:", ticket.id),
    )
    .with_actions(join_buttons(ticket))
}

fn join_buttons(ticket: &EscrowTicket) -> Vec<ActionButton> {
    let mut buttons = Vec::new();
    if ticket.buyer_id.is_none() {
        buttons.push(ActionButton::new("Buyer", &ticket.id, Action::JoinBuyer));
    }
    if ticket.seller_id.is_none() {
        buttons.push(ActionButton::new("Seller", &ticket.id, Action::JoinSeller));
    }
    buttons.push(ActionButton::new("Cancel", &ticket.id, Action::Cancel));
    buttons
}

fn dispute_button(ticket: &EscrowTicket) -> ActionButton {
    ActionButton::new("Dispute", &ticket.id, Action::RaiseDispute)
}

/// Messages for a non-dispute event; dispute events are rendered by the
/// dispute manager
pub fn render(event: &TradeEvent, ticket: &EscrowTicket, config: &EscrowConfig) -> Vec<Notification> {
    let id = &ticket.id;
    let chat = ticket.origin_chat;
    let buyer = describe_user(ticket, ticket.buyer_id);
    let seller = describe_user(ticket, ticket.seller_id);

    match event {
        TradeEvent::Joined { user, role } => {
            let waiting = match role {
                Role::Buyer if ticket.seller_id.is_none() => " Waiting for the seller to join.",
                Role::Seller if ticket.buyer_id.is_none() => " Waiting for the buyer to join.",
                _ => "",
            };
            let mut group = Notification::chat(
                chat,
                format!(
                    "{} {} joined ticket {}.{}",
                    capitalize(*role),
                    ticket.display_name(*user),
                    id,
                    waiting
                ),
            );
            if !ticket.both_joined() {
                group = group.with_actions(join_buttons(ticket));
            }
            vec![
                group,
                Notification::admin(format!(
                    "Escrow {}: {} {} joined group {}.",
                    id,
                    capitalize(*role),
                    ticket.display_name(*user),
                    chat
                )),
            ]
        }

        TradeEvent::TradeStarted => {
            let buttons = config
                .catalogue
                .iter()
                .map(|symbol| {
                    ActionButton::new(
                        symbol.symbol(),
                        id,
                        Action::SelectCrypto {
                            symbol: symbol.symbol().to_string(),
                        },
                    )
                })
                .chain([
                    ActionButton::new("Cancel", id, Action::Cancel),
                    dispute_button(ticket),
                ])
                .collect();
            vec![
                Notification::chat(
                    chat,
                    format!(
                        "Both parties have joined successfully!\nEscrow Ticket: {}\nBuyer: {}\nSeller: {}\n\nBuyer, please select a cryptocurrency:",
                        id, buyer, seller
                    ),
                )
                .with_actions(buttons),
                Notification::admin(format!(
                    "Escrow {} started in group {} with Buyer {} and Seller {}.",
                    id, chat, buyer, seller
                )),
            ]
        }

        TradeEvent::CryptoSelected { symbol } => {
            let sign = config.fiat_currency.sign();
            vec![
                Notification::chat(
                    chat,
                    format!(
                        "Crypto selected: {}\n\nPlease type the {} amount you want to pay (e.g., {s}1000, {s}1,000, {s}1,000.00, 1000.00).",
                        symbol,
                        config.fiat_currency,
                        s = sign
                    ),
                )
                .with_actions(vec![
                    ActionButton::new("Cancel", id, Action::Cancel),
                    dispute_button(ticket),
                ]),
                Notification::admin(format!("Escrow {}: Buyer {} selected crypto {}.", id, buyer, symbol)),
            ]
        }

        TradeEvent::AmountSet {
            fiat_amount,
            crypto_amount,
            price,
        } => {
            let Some(symbol) = ticket.crypto_symbol else {
                return Vec::new();
            };
            let wallet = config
                .deposit_wallet(symbol)
                .unwrap_or("(escrow wallet not configured, contact an admin)");
            vec![
                Notification::chat(
                    chat,
                    format!(
                        "Send {} {} (~{}) to the following wallet:\n\n{}\n\nOnce sent, press 'I've Paid' below.",
                        format_crypto(*crypto_amount),
                        symbol,
                        fiat(config, *fiat_amount),
                        wallet
                    ),
                )
                .with_actions(vec![
                    ActionButton::new("I've Paid", id, Action::MarkPaid),
                    dispute_button(ticket),
                ]),
                Notification::admin(format!(
                    "Escrow {} awaiting payment: Buyer {}, Amount: {} / {} {} at {} per {}.",
                    id,
                    buyer,
                    fiat(config, *fiat_amount),
                    format_crypto(*crypto_amount),
                    symbol,
                    fiat(config, *price),
                    symbol
                )),
            ]
        }

        TradeEvent::PaymentDeclared => vec![
            Notification::chat(
                chat,
                "Buyer marked the payment as sent. Waiting for an admin to confirm receipt.",
            )
            .with_actions(vec![dispute_button(ticket)]),
            Notification::admin(format!(
                "Escrow {}: Buyer {} reports payment of {}. Confirm receipt?",
                id,
                buyer,
                legs(ticket, config)
            ))
            .with_actions(vec![
                ActionButton::new("Payment received", id, Action::AdminDecision { approved: true }),
                ActionButton::new("Not received", id, Action::AdminDecision { approved: false }),
            ]),
        ],

        TradeEvent::PaymentConfirmed => vec![
            Notification::chat(
                chat,
                format!(
                    "Payment confirmed by escrow. Seller {}, please send the goods and press 'Goods sent'.",
                    seller
                ),
            )
            .with_actions(vec![
                ActionButton::new("Goods sent", id, Action::SellerMarkSent),
                dispute_button(ticket),
            ]),
            Notification::admin(format!("Escrow {}: payment confirmed.", id)),
        ],

        TradeEvent::PaymentRejected => vec![
            Notification::chat(
                chat,
                "Escrow has not received the payment yet. Buyer, check the transfer and press 'I've Paid' again.",
            )
            .with_actions(vec![
                ActionButton::new("I've Paid", id, Action::MarkPaid),
                dispute_button(ticket),
            ]),
            Notification::admin(format!("Escrow {}: payment marked as not received.", id)),
        ],

        TradeEvent::GoodsSent => {
            let mut text = format!(
                "Seller marked the goods as sent. Buyer {}, press 'Goods received' once they arrive.",
                buyer
            );
            if let Some(minutes) = config.auto_dispute_minutes {
                text.push_str(&format!(
                    " If there is no response within {} minutes a dispute is opened automatically.",
                    minutes
                ));
            }
            vec![
                Notification::chat(chat, text).with_actions(vec![
                    ActionButton::new("Goods received", id, Action::BuyerConfirmReceipt),
                    dispute_button(ticket),
                ]),
                Notification::admin(format!("Escrow {}: Seller {} marked goods sent.", id, seller)),
            ]
        }

        TradeEvent::ReceiptConfirmed => {
            let symbol = ticket
                .crypto_symbol
                .map(|s| s.symbol())
                .unwrap_or("payout");
            vec![
                Notification::chat(
                    chat,
                    format!(
                        "Buyer confirmed receipt. Seller {}, please reply with your {} wallet address for the payout.",
                        seller, symbol
                    ),
                )
                .with_actions(vec![dispute_button(ticket)]),
                Notification::admin(format!("Escrow {}: Buyer {} confirmed receipt.", id, buyer)),
            ]
        }

        TradeEvent::WalletSubmitted { settlement } => {
            let wallet = ticket.payout_wallet_address.as_deref().unwrap_or("-");
            vec![
                Notification::chat(
                    chat,
                    format!(
                        "Payout wallet received. An admin will release {} to the seller (escrow fee {}).",
                        fiat(config, settlement.payout),
                        fiat(config, settlement.fee)
                    ),
                )
                .with_actions(vec![dispute_button(ticket)]),
                Notification::admin(format!(
                    "Escrow {} ready for release.\nTrade: {}\nPay out: {} (fee {})\nSeller wallet: {}",
                    id,
                    legs(ticket, config),
                    fiat(config, settlement.payout),
                    fiat(config, settlement.fee),
                    wallet
                ))
                .with_actions(vec![ActionButton::new("Release", id, Action::AdminRelease)]),
            ]
        }

        TradeEvent::Released => vec![
            Notification::chat(
                chat,
                format!("Trade {} completed. Funds released to the seller. Thank you for using escrow!", id),
            ),
            Notification::admin(format!("Escrow {} completed.", id)),
        ],

        TradeEvent::Cancelled { by } => vec![
            Notification::chat(chat, "Escrow has been closed, use /escrow to open a new trade."),
            Notification::admin(format!("Escrow {} in group {} was cancelled by {}.", id, chat, by)),
        ],

        TradeEvent::Disputed { .. } | TradeEvent::DisputeResolved { .. } => Vec::new(),
    }
}

/// Buttons valid in the ticket's current status, for any observer
pub fn available_actions(ticket: &EscrowTicket, config: &EscrowConfig) -> Vec<ActionButton> {
    let id = &ticket.id;
    let mut actions = match ticket.status {
        TicketStatus::Created => return join_buttons(ticket),
        TicketStatus::CryptoSelection => config
            .catalogue
            .iter()
            .map(|symbol| {
                ActionButton::new(
                    symbol.symbol(),
                    id,
                    Action::SelectCrypto {
                        symbol: symbol.symbol().to_string(),
                    },
                )
            })
            .chain([ActionButton::new("Cancel", id, Action::Cancel)])
            .collect(),
        TicketStatus::AwaitingAmount => vec![ActionButton::new("Cancel", id, Action::Cancel)],
        TicketStatus::AwaitingPayment => vec![ActionButton::new("I've Paid", id, Action::MarkPaid)],
        TicketStatus::AwaitingAdminConfirmation => vec![
            ActionButton::new("Payment received", id, Action::AdminDecision { approved: true }),
            ActionButton::new("Not received", id, Action::AdminDecision { approved: false }),
        ],
        TicketStatus::PaymentConfirmed => {
            vec![ActionButton::new("Goods sent", id, Action::SellerMarkSent)]
        }
        TicketStatus::AwaitingBuyerAction => {
            vec![ActionButton::new("Goods received", id, Action::BuyerConfirmReceipt)]
        }
        TicketStatus::AwaitingSellerWallet => Vec::new(),
        TicketStatus::AwaitingAdminRelease => {
            vec![ActionButton::new("Release", id, Action::AdminRelease)]
        }
        TicketStatus::Disputed => {
            return [
                ("Release to seller", DisputeOutcome::ReleaseToSeller),
                ("Refund buyer", DisputeOutcome::RefundBuyer),
                ("Resume trade", DisputeOutcome::Resume),
            ]
            .into_iter()
            .map(|(label, outcome)| ActionButton::new(label, id, Action::ResolveDispute { outcome }))
            .collect();
        }
        TicketStatus::Completed | TicketStatus::Cancelled => return Vec::new(),
    };
    actions.push(dispute_button(ticket));
    actions
}

fn capitalize(role: Role) -> &'static str {
    match role {
        Role::Buyer => "Buyer",
        Role::Seller => "Seller",
        Role::Admin => "Admin",
    }
}

fn legs(ticket: &EscrowTicket, config: &EscrowConfig) -> String {
    match (ticket.fiat_amount, ticket.crypto_amount, ticket.crypto_symbol) {
        (Some(f), Some(c), Some(symbol)) => {
            format!("{} {} (~{})", format_crypto(c), symbol, fiat(config, f))
        }
        _ => "amount not set".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Recipient;
    use escrowbot_types::{ChatId, CryptoSymbol, TicketId};
    use rust_decimal_macros::dec;

    fn ticket() -> EscrowTicket {
        let mut ticket = EscrowTicket::new(TicketId::generate(), ChatId(-3));
        ticket.buyer_id = Some(UserId(1));
        ticket.seller_id = Some(UserId(2));
        ticket.crypto_symbol = Some(CryptoSymbol::BTC);
        ticket.status = TicketStatus::AwaitingPayment;
        ticket
    }

    #[test]
    fn test_deposit_instructions() {
        let config = EscrowConfig::default().with_wallet(CryptoSymbol::BTC, "bc1qescrowwallet");
        let event = TradeEvent::AmountSet {
            fiat_amount: dec!(100),
            crypto_amount: dec!(0.005),
            price: dec!(20000),
        };

        let notes = render(&event, &ticket(), &config);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].recipient, Recipient::Chat(ChatId(-3)));
        assert!(notes[0].text.starts_with("Send 0.00500000 BTC (~£100)"));
        assert!(notes[0].text.contains("bc1qescrowwallet"));
        let actions: Vec<_> = notes[0].actions.iter().map(|b| b.action.clone()).collect();
        assert_eq!(actions, vec![Action::MarkPaid, Action::RaiseDispute]);
    }

    #[test]
    fn test_trade_started_offers_catalogue() {
        let config = EscrowConfig {
            catalogue: vec![CryptoSymbol::BTC, CryptoSymbol::SOL],
            ..Default::default()
        };
        let notes = render(&TradeEvent::TradeStarted, &ticket(), &config);
        let labels: Vec<_> = notes[0].actions.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["BTC", "SOL", "Cancel", "Dispute"]);
    }

    #[test]
    fn test_messages_use_participant_handles() {
        let mut ticket = ticket();
        ticket.buyer_username = Some("alice".to_string());

        let notes = render(&TradeEvent::TradeStarted, &ticket, &EscrowConfig::default());
        assert!(notes[0].text.contains("Buyer: @alice"));
        assert!(notes[0].text.contains("Seller: user 2"));

        let joined = TradeEvent::Joined {
            user: UserId(1),
            role: Role::Buyer,
        };
        let notes = render(&joined, &ticket, &EscrowConfig::default());
        assert!(notes[1].text.contains("Buyer @alice joined group -3"));
    }

    #[test]
    fn test_admin_decision_buttons() {
        let notes = render(&TradeEvent::PaymentDeclared, &ticket(), &EscrowConfig::default());
        assert_eq!(notes[1].recipient, Recipient::Admin);
        assert_eq!(notes[1].actions.len(), 2);
    }

    #[test]
    fn test_available_actions_follow_status() {
        let config = EscrowConfig::default();
        let mut ticket = ticket();

        let actions: Vec<_> = available_actions(&ticket, &config)
            .into_iter()
            .map(|b| b.action)
            .collect();
        assert_eq!(actions, vec![Action::MarkPaid, Action::RaiseDispute]);

        ticket.status = TicketStatus::Disputed;
        assert!(available_actions(&ticket, &config)
            .iter()
            .all(|b| matches!(b.action, Action::ResolveDispute { .. })));

        ticket.status = TicketStatus::Completed;
        assert!(available_actions(&ticket, &config).is_empty());
    }

    #[test]
    fn test_prompt_and_welcome() {
        let fresh = EscrowTicket::new(TicketId::generate(), ChatId(-9));
        let prompt = ticket_prompt(&fresh);
        assert_eq!(prompt.actions.len(), 3);
        assert!(welcome_text().contains("/escrow"));
    }
}
