//! Auto-dispute timers
//!
//! When the seller marks goods sent, a timer is armed for the ticket. If the
//! buyer has not confirmed receipt by the time it fires, the desk raises a
//! dispute on the buyer's behalf.

use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use escrowbot_types::TicketId;

/// Pending timers keyed by ticket
#[derive(Debug, Default)]
pub struct AutoDisputeTimers {
    pending: Arc<DashMap<TicketId, (u64, JoinHandle<()>)>>,
    generation: AtomicU64,
}

impl AutoDisputeTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fire` after `delay` unless cancelled first
    ///
    /// Re-arming a ticket replaces its previous timer.
    pub fn schedule<F>(&self, ticket_id: TicketId, delay: Duration, fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let key = ticket_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Disarm before firing so the fired command cannot abort this task
            pending.remove_if(&key, |_, (armed, _)| *armed == generation);
            fire.await;
        });

        if let Some((_, previous)) = self.pending.insert(ticket_id, (generation, task)) {
            previous.abort();
        }
    }

    /// Abort the ticket's timer; returns `true` if one was armed
    pub fn cancel(&self, ticket_id: &TicketId) -> bool {
        match self.pending.remove(ticket_id) {
            Some((_, (_, task))) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, ticket_id: &TicketId) -> bool {
        self.pending.contains_key(ticket_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let timers = AutoDisputeTimers::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let id = TicketId::generate();

        timers.schedule(id.clone(), Duration::from_secs(60), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(timers.is_armed(&id));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!timers.is_armed(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let timers = AutoDisputeTimers::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let id = TicketId::generate();

        timers.schedule(id.clone(), Duration::from_secs(60), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(timers.cancel(&id));
        assert!(!timers.cancel(&id));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(timers.is_empty());
    }
}
