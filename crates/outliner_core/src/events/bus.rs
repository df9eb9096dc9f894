//! In-process change bus.
//!
//! # Responsibility
//! - Register/unregister change subscribers.
//! - Deliver each event to every subscriber in registration order.
//!
//! # Invariants
//! - Delivery is synchronous, exactly-once and in order.
//! - A panicking subscriber is logged and skipped; later subscribers still
//!   receive the event.

use crate::events::ChangeEvent;
use log::error;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receiver of change events.
///
/// Handlers run while the repository's mutation gate is held: they may read
/// the repository, and a mutation issued from a handler fails with
/// `ReentrantMutation`.
pub trait ChangeSubscriber: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

impl<F> ChangeSubscriber for F
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) {
        self(event)
    }
}

/// Handle returned by [`ChangeBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Registration-ordered fan-out of change events.
#[derive(Default)]
pub struct ChangeBus {
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn ChangeSubscriber>)>>,
    next_id: AtomicU64,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn ChangeSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Returns `false` when `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(current, _)| *current != id);
        subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Delivers `event` and returns how many subscribers handled it cleanly.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        // Snapshot so handlers can (un)subscribe without deadlocking.
        let subscribers: Vec<(SubscriptionId, Arc<dyn ChangeSubscriber>)> =
            self.subscribers.read().clone();

        let mut delivered = 0;
        for (id, subscriber) in subscribers {
            match catch_unwind(AssertUnwindSafe(|| subscriber.on_change(event))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(
                    "event=change_delivery module=events status=error subscription={} sequence={}",
                    id.0, event.sequence
                ),
            }
        }
        delivered
    }
}
