//! End-to-end trade scenarios against the escrow desk

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use escrowbot_core::{
    Action, Actor, Command, EscrowConfig, EscrowDesk, MemoryNotifier, Recipient, TicketRef,
};
use escrowbot_quotes::FixedQuotes;
use escrowbot_types::{
    ChatId, CryptoSymbol, DisputeOutcome, EscrowError, EscrowTicket, TicketStatus, UserId,
};

const CHAT: ChatId = ChatId(-1001);
const BUYER: UserId = UserId(101);
const SELLER: UserId = UserId(202);
const ADMIN: UserId = UserId(900);

struct Harness {
    desk: EscrowDesk,
    quotes: Arc<FixedQuotes>,
    notifier: Arc<MemoryNotifier>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(EscrowConfig::default())
    }

    fn with_config(config: EscrowConfig) -> Self {
        let config = config
            .with_admin(ADMIN)
            .with_wallet(CryptoSymbol::BTC, "bc1qescrowdeposit");
        let quotes = Arc::new(FixedQuotes::with_prices([
            (CryptoSymbol::BTC, dec!(20000)),
            (CryptoSymbol::ETH, dec!(1000)),
        ]));
        let notifier = Arc::new(MemoryNotifier::new());
        let desk = EscrowDesk::new(config, quotes.clone(), notifier.clone()).unwrap();
        Self {
            desk,
            quotes,
            notifier,
        }
    }

    async fn run(&self, user: UserId, action: Action) -> Result<EscrowTicket, EscrowError> {
        self.desk.execute(Command::by_user(CHAT, user, action)).await
    }

    /// Open a ticket and drive it to `awaiting_payment` at £100 in BTC
    async fn funded_ticket(&self) -> EscrowTicket {
        self.desk.open_ticket(CHAT).await;
        self.run(BUYER, Action::JoinBuyer).await.unwrap();
        self.run(SELLER, Action::JoinSeller).await.unwrap();
        self.run(BUYER, Action::SelectCrypto { symbol: "BTC".into() })
            .await
            .unwrap();
        self.run(BUYER, Action::SetAmount { amount: "£100".into() })
            .await
            .unwrap()
    }

    async fn shipped_ticket(&self) -> EscrowTicket {
        self.funded_ticket().await;
        self.run(BUYER, Action::MarkPaid).await.unwrap();
        self.run(ADMIN, Action::AdminDecision { approved: true })
            .await
            .unwrap();
        self.run(SELLER, Action::SellerMarkSent).await.unwrap()
    }
}

#[tokio::test]
async fn test_full_trade_settles_and_closes() {
    let h = Harness::new();

    let opened = h.desk.open_ticket(CHAT).await;
    assert_eq!(opened.status, TicketStatus::Created);
    assert_eq!(h.desk.open_ticket(CHAT).await.id, opened.id);

    h.run(BUYER, Action::JoinBuyer).await.unwrap();
    let ticket = h.run(SELLER, Action::JoinSeller).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::CryptoSelection);

    h.run(BUYER, Action::SelectCrypto { symbol: "BTC".into() })
        .await
        .unwrap();
    let ticket = h
        .run(BUYER, Action::SetAmount { amount: "100".into() })
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::AwaitingPayment);
    assert_eq!(ticket.fiat_amount, Some(dec!(100)));
    assert_eq!(ticket.crypto_amount, Some(dec!(0.005)));

    let deposit = h.notifier.for_chat(CHAT).last().cloned().unwrap();
    assert!(deposit.text.contains("0.00500000 BTC"));
    assert!(deposit.text.contains("bc1qescrowdeposit"));

    h.run(BUYER, Action::MarkPaid).await.unwrap();
    h.run(ADMIN, Action::AdminDecision { approved: true })
        .await
        .unwrap();
    h.run(SELLER, Action::SellerMarkSent).await.unwrap();
    h.run(BUYER, Action::BuyerConfirmReceipt).await.unwrap();
    let ticket = h
        .run(SELLER, Action::SubmitWallet { address: "bc1qseller".into() })
        .await
        .unwrap();
    let settlement = ticket.settlement.unwrap();
    assert_eq!(settlement.fee, dec!(5));
    assert_eq!(settlement.payout, dec!(95));
    assert_eq!(settlement.fee + settlement.payout, dec!(100));

    let ticket = h.run(ADMIN, Action::AdminRelease).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Completed);
    assert_eq!(h.desk.live_tickets(), 0);
    assert!(h.desk.active_ticket_for(BUYER).await.is_none());

    let err = h
        .desk
        .execute(Command::by_user(ticket.id.clone(), BUYER, Action::MarkPaid))
        .await
        .unwrap_err();
    assert!(matches!(err, EscrowError::NotFound { .. }));

    let admin_log: Vec<String> = h.notifier.admin().into_iter().map(|n| n.text).collect();
    assert!(admin_log.iter().any(|t| t.contains("ready for release")));
    assert!(admin_log.last().unwrap().contains("completed"));
}

#[tokio::test]
async fn test_dispute_freezes_until_admin_refund() {
    let h = Harness::new();
    h.funded_ticket().await;
    h.run(BUYER, Action::MarkPaid).await.unwrap();
    h.run(ADMIN, Action::AdminDecision { approved: true })
        .await
        .unwrap();

    let ticket = h.run(SELLER, Action::RaiseDispute).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Disputed);
    assert_eq!(ticket.disputed_from, Some(TicketStatus::PaymentConfirmed));

    let alert = h.notifier.admin().last().cloned().unwrap();
    assert!(alert.text.contains("DISPUTE"));
    assert!(alert.text.contains("£100"));
    assert!(alert.text.contains("user 101"));
    assert!(alert.text.contains("user 202"));

    let before = h.notifier.len();
    assert!(matches!(
        h.run(SELLER, Action::SellerMarkSent).await,
        Err(EscrowError::InvalidState { .. })
    ));
    assert!(matches!(
        h.run(BUYER, Action::Cancel).await,
        Err(EscrowError::InvalidState { .. })
    ));
    assert!(matches!(
        h.run(BUYER, Action::RaiseDispute).await,
        Err(EscrowError::AlreadyDisputed { .. })
    ));
    assert!(matches!(
        h.run(BUYER, Action::ResolveDispute { outcome: DisputeOutcome::RefundBuyer }).await,
        Err(EscrowError::Unauthorized { .. })
    ));
    assert_eq!(h.notifier.len(), before);

    let ticket = h
        .run(ADMIN, Action::ResolveDispute { outcome: DisputeOutcome::RefundBuyer })
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Cancelled);
    assert_eq!(h.desk.live_tickets(), 0);
}

#[tokio::test]
async fn test_dispute_resume_restores_status() {
    let h = Harness::new();
    h.funded_ticket().await;
    h.run(BUYER, Action::RaiseDispute).await.unwrap();

    let ticket = h
        .run(ADMIN, Action::ResolveDispute { outcome: DisputeOutcome::Resume })
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::AwaitingPayment);
    assert!(!ticket.flags.disputed);

    let ticket = h.run(BUYER, Action::MarkPaid).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::AwaitingAdminConfirmation);
}

#[tokio::test]
async fn test_quote_outage_leaves_ticket_untouched() {
    let h = Harness::new();
    h.desk.open_ticket(CHAT).await;
    h.run(BUYER, Action::JoinBuyer).await.unwrap();
    h.run(SELLER, Action::JoinSeller).await.unwrap();
    h.run(BUYER, Action::SelectCrypto { symbol: "BTC".into() })
        .await
        .unwrap();

    h.quotes.set_unavailable(CryptoSymbol::BTC);
    let before = h.desk.ticket(&TicketRef::Chat(CHAT)).await.unwrap();
    let sent = h.notifier.len();

    let err = h
        .run(BUYER, Action::SetAmount { amount: "£1,000".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, EscrowError::QuoteUnavailable { symbol: CryptoSymbol::BTC, .. }));
    assert!(err.is_retriable());
    assert_eq!(h.desk.ticket(&TicketRef::Chat(CHAT)).await.unwrap(), before);
    assert_eq!(h.notifier.len(), sent);

    h.quotes.restore(CryptoSymbol::BTC);
    let ticket = h
        .run(BUYER, Action::SetAmount { amount: "£1,000".into() })
        .await
        .unwrap();
    assert_eq!(ticket.crypto_amount, Some(dec!(0.05)));
}

#[tokio::test]
async fn test_invalid_amount_skips_quote() {
    let h = Harness::new();
    h.desk.open_ticket(CHAT).await;
    h.run(BUYER, Action::JoinBuyer).await.unwrap();
    h.run(SELLER, Action::JoinSeller).await.unwrap();
    h.run(BUYER, Action::SelectCrypto { symbol: "ETH".into() })
        .await
        .unwrap();

    for text in ["£0", "-5", "ten pounds"] {
        let err = h
            .run(BUYER, Action::SetAmount { amount: text.into() })
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput { .. }), "{}", text);
    }
    assert_eq!(h.quotes.request_count(), 0);
}

#[tokio::test]
async fn test_cancel_window_closes_at_payment() {
    let h = Harness::new();
    h.funded_ticket().await;

    let err = h.run(BUYER, Action::Cancel).await.unwrap_err();
    assert!(matches!(
        err,
        EscrowError::InvalidState {
            status: TicketStatus::AwaitingPayment,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        format!(
            "Ticket {} is awaiting_payment, cannot cancel",
            h.desk.ticket(&TicketRef::Chat(CHAT)).await.unwrap().id
        )
    );
}

#[tokio::test]
async fn test_cancel_releases_participants() {
    let h = Harness::new();
    let other_chat = ChatId(-2002);

    h.desk.open_ticket(CHAT).await;
    h.run(BUYER, Action::JoinBuyer).await.unwrap();

    h.desk.open_ticket(other_chat).await;
    let err = h
        .desk
        .execute(Command::by_user(other_chat, BUYER, Action::JoinSeller))
        .await
        .unwrap_err();
    assert!(matches!(err, EscrowError::ParticipantBusy { .. }));

    let ticket = h.run(BUYER, Action::Cancel).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Cancelled);
    assert!(h.notifier.for_chat(CHAT).last().unwrap().text.contains("/escrow"));

    h.desk
        .execute(Command::by_user(other_chat, BUYER, Action::JoinSeller))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_fill_one_seat() {
    let h = Harness::new();
    let ticket = h.desk.open_ticket(CHAT).await;

    let tasks: Vec<_> = (1..=8)
        .map(|n| {
            let desk = h.desk.clone();
            let id = ticket.id.clone();
            tokio::spawn(async move {
                desk.execute(Command::by_user(id, UserId(n), Action::JoinBuyer))
                    .await
            })
        })
        .collect();

    let mut joined = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => joined += 1,
            Err(e) => assert!(matches!(e, EscrowError::SeatTaken { .. })),
        }
    }
    assert_eq!(joined, 1);

    let ticket = h.desk.ticket(&TicketRef::Id(ticket.id)).await.unwrap();
    assert!(ticket.buyer_id.is_some());
    assert_eq!(ticket.seller_id, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_user_racing_both_seats_gets_one() {
    let h = Harness::new();

    for round in 0..16 {
        let chat = ChatId(-2000 - round);
        let user = UserId(500 + round);
        let ticket = h.desk.open_ticket(chat).await;

        let tasks: Vec<_> = [Action::JoinBuyer, Action::JoinSeller]
            .into_iter()
            .map(|action| {
                let desk = h.desk.clone();
                let id = ticket.id.clone();
                tokio::spawn(async move { desk.execute(Command::by_user(id, user, action)).await })
            })
            .collect();

        let mut seated = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => seated += 1,
                Err(e) => assert!(matches!(e, EscrowError::SameParticipant { .. })),
            }
        }
        assert_eq!(seated, 1);

        let ticket = h.desk.ticket(&TicketRef::Id(ticket.id)).await.unwrap();
        assert_eq!(ticket.participants(), vec![user]);
        assert_ne!(ticket.buyer_id, ticket.seller_id);
        assert_eq!(ticket.status, TicketStatus::Created);
    }
}

#[tokio::test]
async fn test_handles_appear_in_notifications() {
    let h = Harness::new();
    h.desk.open_ticket(CHAT).await;

    h.desk
        .execute(Command::by_user(CHAT, BUYER, Action::JoinBuyer).with_username("@alice"))
        .await
        .unwrap();
    let ticket = h
        .desk
        .execute(Command::by_user(CHAT, SELLER, Action::JoinSeller).with_username("bob"))
        .await
        .unwrap();
    assert_eq!(ticket.buyer_username.as_deref(), Some("alice"));

    let started = h.notifier.admin().last().cloned().unwrap();
    assert!(started.text.contains("Buyer @alice"));
    assert!(started.text.contains("Seller @bob"));

    h.run(SELLER, Action::RaiseDispute).await.unwrap();
    let alert = h.notifier.admin().last().cloned().unwrap();
    assert!(alert.text.contains("Raised by: seller (@bob)"));
}

#[tokio::test]
async fn test_only_bound_roles_drive_the_trade() {
    let h = Harness::new();
    h.funded_ticket().await;

    let outsider = UserId(555);
    assert!(matches!(
        h.run(outsider, Action::MarkPaid).await,
        Err(EscrowError::Unauthorized { .. })
    ));
    assert!(matches!(
        h.run(SELLER, Action::MarkPaid).await,
        Err(EscrowError::Unauthorized { .. })
    ));
    h.run(BUYER, Action::MarkPaid).await.unwrap();
    assert!(matches!(
        h.run(BUYER, Action::AdminDecision { approved: true }).await,
        Err(EscrowError::Unauthorized { .. })
    ));

    let ticket = h
        .run(ADMIN, Action::AdminDecision { approved: false })
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::AwaitingPayment);
}

#[tokio::test]
async fn test_unknown_chat_is_not_found() {
    let h = Harness::new();
    let err = h.run(BUYER, Action::JoinBuyer).await.unwrap_err();
    assert!(matches!(err, EscrowError::NotFound { .. }));
    assert!(h.notifier.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_silent_buyer_triggers_auto_dispute() {
    let h = Harness::with_config(EscrowConfig::default().with_auto_dispute_minutes(30));
    let ticket = h.shipped_ticket().await;
    assert_eq!(ticket.status, TicketStatus::AwaitingBuyerAction);
    assert!(h.desk.auto_dispute_armed(&ticket.id));

    tokio::time::sleep(Duration::from_secs(29 * 60)).await;
    let still = h.desk.ticket(&TicketRef::Id(ticket.id.clone())).await.unwrap();
    assert_eq!(still.status, TicketStatus::AwaitingBuyerAction);

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    let frozen = h.desk.ticket(&TicketRef::Id(ticket.id.clone())).await.unwrap();
    assert_eq!(frozen.status, TicketStatus::Disputed);
    assert_eq!(frozen.disputed_from, Some(TicketStatus::AwaitingBuyerAction));
    assert!(!h.desk.auto_dispute_armed(&ticket.id));

    let alert = h.notifier.admin().last().cloned().unwrap();
    assert_eq!(alert.recipient, Recipient::Admin);
    assert!(alert.text.contains("did not respond"));
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_receipt_disarms_timer() {
    let h = Harness::with_config(EscrowConfig::default().with_auto_dispute_minutes(30));
    let ticket = h.shipped_ticket().await;

    h.run(BUYER, Action::BuyerConfirmReceipt).await.unwrap();
    assert!(!h.desk.auto_dispute_armed(&ticket.id));

    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    let ticket = h.desk.ticket(&TicketRef::Id(ticket.id)).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::AwaitingSellerWallet);
}

#[tokio::test]
async fn test_system_actor_cannot_dispute_early() {
    let h = Harness::new();
    let ticket = h.funded_ticket().await;
    let err = h
        .desk
        .execute(Command::new(ticket.id, Actor::System, Action::RaiseDispute))
        .await
        .unwrap_err();
    assert!(matches!(err, EscrowError::Unauthorized { .. }));
}
