//! Subscription manager for broadcasting store changes.

use super::changes::StoreChanges;
use crossbeam_channel::{bounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a change subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered notifications before the subscriber is dropped.
    /// Default: 1024
    pub buffer_size: usize,

    /// Only deliver items of this entity (None = all entities).
    pub entity: Option<String>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            entity: None,
        }
    }
}

impl SubscriptionConfig {
    /// Subscribe to one entity.
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: Some(entity.into()),
            ..Default::default()
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiving end of a change subscription.
///
/// The channel disconnects when the source drops the subscription.
pub struct ChangeSubscription {
    pub id: SubscriptionId,
    pub receiver: Receiver<StoreChanges>,
}

impl ChangeSubscription {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<StoreChanges, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<StoreChanges, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<StoreChanges, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// A source of per-transaction change notifications.
pub trait ChangeSource {
    fn subscribe(&self, config: SubscriptionConfig) -> ChangeSubscription;

    /// Stop delivering to a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<S: ChangeSource + ?Sized> ChangeSource for Arc<S> {
    fn subscribe(&self, config: SubscriptionConfig) -> ChangeSubscription {
        (**self).subscribe(config)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id)
    }
}

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<StoreChanges>,
}

impl Subscription {
    /// The part of `changes` this subscription wants, if any.
    fn select(&self, changes: &StoreChanges) -> Option<StoreChanges> {
        let selected = match &self.config.entity {
            Some(entity) => changes.for_entity(entity),
            None => changes.clone(),
        };
        (!selected.is_empty()).then_some(selected)
    }

    /// Try to send. Returns false if the buffer is full or the receiver is gone.
    fn try_send(&self, changes: StoreChanges) -> bool {
        self.sender.try_send(changes).is_ok()
    }
}

/// Fans committed changes out to subscribers over bounded channels.
///
/// A subscriber whose buffer overflows is dropped; its channel disconnects.
pub struct ChangeBroadcaster {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl ChangeBroadcaster {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, config: SubscriptionConfig) -> ChangeSubscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size);

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        tracing::debug!(target: "fetched_results::store", id = id.0, "subscribed");
        ChangeSubscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.subscriptions.write().remove(&id).is_some() {
            tracing::debug!(target: "fetched_results::store", id = id.0, "unsubscribed");
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Deliver one transaction's changes to every interested subscriber.
    pub fn broadcast(&self, changes: &StoreChanges) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if let Some(selected) = sub.select(changes) {
                    if !sub.try_send(selected) {
                        to_remove.push(*id);
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if subs.remove(&id).is_some() {
                    tracing::warn!(
                        target: "fetched_results::store",
                        id = id.0,
                        "dropping subscriber: buffer full or receiver gone"
                    );
                }
            }
        }
    }
}

impl Default for ChangeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
