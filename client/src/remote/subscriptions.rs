//! Subscription registry.
//!
//! Tracks live collection subscriptions and fans snapshots out to them.

use dashmap::DashMap;
use pantry_engine::{CollectionName, OrderKey, Snapshot};
use tokio::sync::mpsc;

use super::SubscriptionHandle;

/// Sender half of a subscription channel.
pub type SnapshotSender = mpsc::UnboundedSender<Snapshot>;

/// A single live subscription.
#[derive(Debug)]
struct Subscriber {
    collection: CollectionName,
    order: OrderKey,
    sender: SnapshotSender,
}

/// Manages live subscriptions.
///
/// Thread-safe and can be shared via `Arc`.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// All live subscriptions, keyed by handle id.
    subscribers: DashMap<String, Subscriber>,
    /// Index of subscription ids by collection.
    by_collection: DashMap<CollectionName, Vec<String>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            by_collection: DashMap::new(),
        }
    }

    /// Register a subscription and return its handle.
    pub fn register(
        &self,
        collection: &str,
        order: OrderKey,
        sender: SnapshotSender,
    ) -> SubscriptionHandle {
        let id = uuid::Uuid::new_v4().to_string();

        self.subscribers.insert(
            id.clone(),
            Subscriber {
                collection: collection.to_string(),
                order,
                sender,
            },
        );
        self.by_collection
            .entry(collection.to_string())
            .or_default()
            .push(id.clone());

        tracing::debug!(subscription = %id, collection, "Subscription registered");

        SubscriptionHandle(id)
    }

    /// Remove a subscription. Returns `false` if the handle was not live.
    pub fn unregister(&self, handle: &SubscriptionHandle) -> bool {
        let Some((_, subscriber)) = self.subscribers.remove(handle.as_str()) else {
            return false;
        };

        if let Some(mut ids) = self.by_collection.get_mut(&subscriber.collection) {
            ids.retain(|id| id != handle.as_str());
            if ids.is_empty() {
                drop(ids);
                self.by_collection.remove(&subscriber.collection);
            }
        }

        tracing::debug!(
            subscription = %handle.as_str(),
            collection = %subscriber.collection,
            "Subscription removed"
        );
        true
    }

    /// Send one subscriber its first snapshot.
    pub fn deliver(&self, handle: &SubscriptionHandle, render: impl Fn(OrderKey) -> Snapshot) -> bool {
        match self.subscribers.get(handle.as_str()) {
            Some(subscriber) => subscriber.sender.send(render(subscriber.order)).is_ok(),
            None => false,
        }
    }

    /// Send a fresh snapshot to every subscriber of `collection`.
    ///
    /// `render` builds the snapshot in the subscriber's requested order.
    /// Subscribers whose receiver is gone are dropped. Returns the number of
    /// subscribers that received the snapshot.
    pub fn publish(&self, collection: &str, render: impl Fn(OrderKey) -> Snapshot) -> usize {
        let ids = match self.by_collection.get(collection) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        let mut sent_count = 0;
        let mut closed = Vec::new();

        for id in ids {
            if let Some(subscriber) = self.subscribers.get(&id) {
                if subscriber.sender.send(render(subscriber.order)).is_ok() {
                    sent_count += 1;
                } else {
                    closed.push(SubscriptionHandle(id.clone()));
                }
            }
        }

        for handle in closed {
            self.unregister(&handle);
        }

        tracing::debug!(collection, recipients = sent_count, "Published snapshot");

        sent_count
    }

    /// Get the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscribers.len()
    }
}
