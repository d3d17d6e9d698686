//! Remote document store access.
//!
//! The coordinator talks to the shared store only through [`RemoteStore`].
//! Every write is a single, all-or-nothing call; failures come back as
//! [`RemoteError`] values and never panic across the event loop.

mod memory;
mod subscriptions;

pub use memory::MemoryRemoteStore;
pub use subscriptions::{SnapshotSender, SubscriptionRegistry};

use crate::error::RemoteError;
use async_trait::async_trait;
use pantry_engine::{Item, ItemId, NewItem, OrderKey, Quantity, Snapshot};
use tokio::sync::mpsc;

/// Identifies a live subscription for [`RemoteStore::unsubscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub(crate) String);

impl SubscriptionHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A live, ordered view of one remote collection.
///
/// Every delivery is a full snapshot of the collection.
#[derive(Debug)]
pub struct Subscription {
    handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    pub fn new(handle: SubscriptionHandle, receiver: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self { handle, receiver }
    }

    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    /// Wait for the next snapshot. `None` once the store has dropped the
    /// subscription.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }
}

/// Capability over a remote, collection-scoped document store.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Subscribe to `collection`, ordered by `order` descending.
    ///
    /// The current snapshot is delivered immediately, then again after every
    /// change, in the order the store applies them.
    async fn subscribe(&self, collection: &str, order: OrderKey)
        -> Result<Subscription, RemoteError>;

    /// Stop a subscription. Safe to call repeatedly and with stale handles.
    fn unsubscribe(&self, handle: &SubscriptionHandle);

    /// Look up an item by name (case-insensitive).
    async fn find_by_name(&self, collection: &str, name: &str)
        -> Result<Option<Item>, RemoteError>;

    /// Create a document and return its assigned id.
    async fn create(&self, collection: &str, fields: NewItem) -> Result<ItemId, RemoteError>;

    /// Overwrite the quantity of one document.
    async fn update_quantity(
        &self,
        collection: &str,
        id: &str,
        quantity: Quantity,
    ) -> Result<(), RemoteError>;

    /// Delete one document.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

    /// One-shot read of the whole collection, newest first.
    async fn fetch_snapshot(&self, collection: &str) -> Result<Snapshot, RemoteError>;
}
