//! Ticket registry
//!
//! Process-local store of live tickets. Each ticket sits behind its own async
//! mutex so commands on one ticket are serialized while other tickets proceed
//! in parallel. Two secondary indices map a chat to its live ticket and a
//! user to the unresolved trade they are bound to.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use escrowbot_types::{ChatId, EscrowError, EscrowTicket, Result, TicketId, UserId};

/// Shared handle to a live ticket
pub type TicketHandle = Arc<Mutex<EscrowTicket>>;

/// In-memory ticket store
#[derive(Debug, Default)]
pub struct TicketRegistry {
    tickets: DashMap<TicketId, TicketHandle>,
    by_chat: DashMap<ChatId, TicketId>,
    by_user: DashMap<UserId, TicketId>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh ticket for a chat
    ///
    /// Codes are re-rolled until unused. The chat index is not touched; use
    /// [`open`](Self::open) for the chat-scoped entry point.
    pub fn create(&self, origin_chat: ChatId) -> (TicketId, TicketHandle) {
        self.create_with(origin_chat, TicketId::generate)
    }

    /// Allocate a ticket drawing codes from `next_id` until one is unused
    pub fn create_with(
        &self,
        origin_chat: ChatId,
        mut next_id: impl FnMut() -> TicketId,
    ) -> (TicketId, TicketHandle) {
        loop {
            let id = next_id();
            if let Entry::Vacant(slot) = self.tickets.entry(id.clone()) {
                let handle = Arc::new(Mutex::new(EscrowTicket::new(id.clone(), origin_chat)));
                slot.insert(handle.clone());
                return (id, handle);
            }
            tracing::debug!(ticket_id = %id, "Ticket code collision, re-rolling");
        }
    }

    /// Return the chat's live ticket, creating one if it has none
    ///
    /// The boolean is `true` when a new ticket was allocated.
    pub fn open(&self, chat: ChatId) -> (TicketHandle, bool) {
        match self.by_chat.entry(chat) {
            Entry::Occupied(mut existing) => {
                if let Some(handle) = self.tickets.get(existing.get()) {
                    return (handle.value().clone(), false);
                }
                let (id, handle) = self.create(chat);
                existing.insert(id);
                (handle, true)
            }
            Entry::Vacant(slot) => {
                let (id, handle) = self.create(chat);
                slot.insert(id);
                (handle, true)
            }
        }
    }

    /// Look up a ticket by code
    pub fn get(&self, id: &TicketId) -> Result<TicketHandle> {
        self.tickets
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EscrowError::not_found(id))
    }

    /// Snapshot of a live ticket
    pub async fn snapshot(&self, id: &TicketId) -> Result<EscrowTicket> {
        let handle = self.get(id)?;
        let ticket = handle.lock().await;
        if ticket.status.is_terminal() {
            return Err(EscrowError::not_found(id));
        }
        Ok(ticket.clone())
    }

    /// Live ticket code for a chat
    pub fn find_by_chat(&self, chat: ChatId) -> Option<TicketId> {
        self.by_chat.get(&chat).map(|entry| entry.value().clone())
    }

    /// Unresolved trade the user is bound to
    pub fn active_ticket_for(&self, user: UserId) -> Option<TicketId> {
        self.by_user.get(&user).map(|entry| entry.value().clone())
    }

    /// Bind a user to a ticket, failing if they are bound elsewhere
    ///
    /// Re-binding to the same ticket is a no-op.
    pub fn bind_user(&self, user: UserId, ticket_id: &TicketId) -> Result<()> {
        match self.by_user.entry(user) {
            Entry::Occupied(bound) if bound.get() != ticket_id => {
                Err(EscrowError::ParticipantBusy {
                    user_id: user,
                    ticket_id: bound.get().to_string(),
                })
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(ticket_id.clone());
                Ok(())
            }
        }
    }

    /// Drop a ticket and every index entry pointing at it
    ///
    /// Takes the ticket itself because callers remove while holding its lock.
    pub fn remove(&self, ticket: &EscrowTicket) -> bool {
        let removed = self.tickets.remove(&ticket.id).is_some();
        self.by_chat
            .remove_if(&ticket.origin_chat, |_, id| id == &ticket.id);
        for user in ticket.participants() {
            self.by_user.remove_if(&user, |_, id| id == &ticket.id);
        }
        removed
    }

    pub fn contains(&self, id: &TicketId) -> bool {
        self.tickets.contains_key(id)
    }

    /// Number of live tickets
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrowbot_types::TicketStatus;

    #[tokio::test]
    async fn test_open_is_create_or_get() {
        let registry = TicketRegistry::new();
        let chat = ChatId(-100);

        let (first, created) = registry.open(chat);
        assert!(created);
        let (second, created_again) = registry.open(chat);
        assert!(!created_again);
        assert!(Arc::ptr_eq(&first, &second));

        let id = first.lock().await.id.clone();
        assert_eq!(registry.find_by_chat(chat), Some(id.clone()));
        assert_eq!(registry.snapshot(&id).await.unwrap().status, TicketStatus::Created);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ticket() {
        let registry = TicketRegistry::new();
        let id = TicketId::parse("DEADBEEF").unwrap();
        assert!(matches!(registry.get(&id), Err(EscrowError::NotFound { .. })));
        assert!(registry.snapshot(&id).await.is_err());
    }

    #[test]
    fn test_distinct_codes() {
        let registry = TicketRegistry::new();
        let (a, _) = registry.create(ChatId(1));
        let (b, _) = registry.create(ChatId(1));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_code_collision_is_rerolled() {
        let registry = TicketRegistry::new();
        let taken = TicketId::parse("AAAA0001").unwrap();
        let fresh = TicketId::parse("BBBB0002").unwrap();

        let (first, first_handle) = registry.create_with(ChatId(1), || taken.clone());
        assert_eq!(first, taken);

        let mut codes = vec![taken.clone(), taken.clone(), fresh.clone()].into_iter();
        let mut draws = 0;
        let (second, second_handle) = registry.create_with(ChatId(2), || {
            draws += 1;
            codes.next().unwrap()
        });

        assert_eq!(second, fresh);
        assert_eq!(draws, 3);
        assert_eq!(registry.len(), 2);
        assert!(!Arc::ptr_eq(&first_handle, &second_handle));

        let kept = registry.get(&taken).unwrap();
        assert!(Arc::ptr_eq(&kept, &first_handle));
        assert_eq!(kept.try_lock().unwrap().origin_chat, ChatId(1));
        assert_eq!(second_handle.try_lock().unwrap().origin_chat, ChatId(2));
    }

    #[test]
    fn test_bind_user() {
        let registry = TicketRegistry::new();
        let (a, _) = registry.create(ChatId(1));
        let (b, _) = registry.create(ChatId(2));

        registry.bind_user(UserId(7), &a).unwrap();
        registry.bind_user(UserId(7), &a).unwrap();
        let err = registry.bind_user(UserId(7), &b).unwrap_err();
        assert!(matches!(err, EscrowError::ParticipantBusy { .. }));
        assert_eq!(registry.active_ticket_for(UserId(7)), Some(a));
    }

    #[tokio::test]
    async fn test_remove_clears_indices() {
        let registry = TicketRegistry::new();
        let chat = ChatId(-1);
        let (handle, _) = registry.open(chat);
        let ticket = {
            let mut ticket = handle.lock().await;
            ticket.buyer_id = Some(UserId(1));
            ticket.seller_id = Some(UserId(2));
            ticket.clone()
        };
        registry.bind_user(UserId(1), &ticket.id).unwrap();
        registry.bind_user(UserId(2), &ticket.id).unwrap();

        assert!(registry.remove(&ticket));
        assert!(!registry.contains(&ticket.id));
        assert_eq!(registry.find_by_chat(chat), None);
        assert_eq!(registry.active_ticket_for(UserId(1)), None);
        assert_eq!(registry.active_ticket_for(UserId(2)), None);

        let (_, created) = registry.open(chat);
        assert!(created);
    }
}
