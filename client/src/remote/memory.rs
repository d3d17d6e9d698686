//! In-process remote document store.
//!
//! Backs the shell binary and the integration tests. Writes are applied under
//! a single lock and the resulting snapshot is published before the lock is
//! released, so every subscriber sees changes in the order they happened.

use super::{RemoteStore, Subscription, SubscriptionHandle, SubscriptionRegistry};
use crate::error::RemoteError;
use async_trait::async_trait;
use dashmap::DashSet;
use pantry_engine::{
    CollectionName, Item, ItemId, NewItem, OrderKey, Quantity, Snapshot, Timestamp,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Default)]
struct Documents {
    collections: HashMap<CollectionName, Vec<Item>>,
    last_created_at: Timestamp,
}

impl Documents {
    fn render(&self, collection: &str, order: OrderKey) -> Snapshot {
        let mut items = self.collections.get(collection).cloned().unwrap_or_default();
        order.sort(&mut items);
        Snapshot::new(items, crate::now_millis())
    }

    /// Server-assigned creation time, strictly increasing per store.
    fn next_created_at(&mut self) -> Timestamp {
        let now = crate::now_millis();
        self.last_created_at = now.max(self.last_created_at.saturating_add(1));
        self.last_created_at
    }
}

/// Failure switches used to exercise error paths.
#[derive(Debug, Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
    write_ids: DashSet<ItemId>,
}

/// Remote store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<Documents>,
    registry: SubscriptionRegistry,
    writes: AtomicUsize,
    faults: Faults,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert documents as-is, bypassing write accounting and faults.
    pub async fn seed(&self, collection: &str, items: impl IntoIterator<Item = Item>) {
        let mut docs = self.documents.lock().await;
        let target = docs.collections.entry(collection.to_string()).or_default();
        for item in items {
            target.retain(|existing| existing.id != item.id);
            target.push(item);
        }
        let newest = target.iter().map(|item| item.created_at).max().unwrap_or(0);
        docs.last_created_at = docs.last_created_at.max(newest);
        self.publish(&docs, collection);
    }

    /// Current contents of a collection, newest first. Ignores faults.
    pub async fn peek(&self, collection: &str) -> Vec<Item> {
        self.documents
            .lock()
            .await
            .render(collection, OrderKey::CreatedAt)
            .items
    }

    /// Number of write calls received, including failed ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.subscription_count()
    }

    /// Make every read fail until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail until switched off.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes that target `id` fail.
    pub fn fail_writes_for(&self, id: impl Into<ItemId>) {
        self.faults.write_ids.insert(id.into());
    }

    fn check_read(&self) -> Result<(), RemoteError> {
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(RemoteError::ReadFailed("remote unavailable".into()));
        }
        Ok(())
    }

    fn check_write(&self, id: Option<&str>) -> Result<(), RemoteError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(RemoteError::WriteFailed("remote unavailable".into()));
        }
        if let Some(id) = id {
            if self.faults.write_ids.contains(id) {
                return Err(RemoteError::WriteFailed(format!("write rejected for {id}")));
            }
        }
        Ok(())
    }

    fn publish(&self, docs: &Documents, collection: &str) {
        self.registry
            .publish(collection, |order| docs.render(collection, order));
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn subscribe(
        &self,
        collection: &str,
        order: OrderKey,
    ) -> Result<Subscription, RemoteError> {
        self.check_read()?;

        let docs = self.documents.lock().await;
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.registry.register(collection, order, tx);
        self.registry
            .deliver(&handle, |order| docs.render(collection, order));

        Ok(Subscription::new(handle, rx))
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.registry.unregister(handle);
    }

    async fn find_by_name(
        &self,
        collection: &str,
        name: &str,
    ) -> Result<Option<Item>, RemoteError> {
        self.check_read()?;
        let docs = self.documents.lock().await;
        Ok(docs
            .render(collection, OrderKey::CreatedAt)
            .find_by_name(name)
            .cloned())
    }

    async fn create(&self, collection: &str, fields: NewItem) -> Result<ItemId, RemoteError> {
        self.check_write(None)?;

        let mut docs = self.documents.lock().await;
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = docs.next_created_at();
        docs.collections
            .entry(collection.to_string())
            .or_default()
            .push(Item::from_new(id.clone(), fields, created_at));

        tracing::debug!(collection, id = %id, "Document created");
        self.publish(&docs, collection);
        Ok(id)
    }

    async fn update_quantity(
        &self,
        collection: &str,
        id: &str,
        quantity: Quantity,
    ) -> Result<(), RemoteError> {
        self.check_write(Some(id))?;

        let mut docs = self.documents.lock().await;
        let item = docs
            .collections
            .get_mut(collection)
            .and_then(|items| items.iter_mut().find(|item| item.id == id))
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        item.quantity = quantity;

        tracing::debug!(collection, id, quantity, "Document updated");
        self.publish(&docs, collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.check_write(Some(id))?;

        let mut docs = self.documents.lock().await;
        let items = docs
            .collections
            .get_mut(collection)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }

        tracing::debug!(collection, id, "Document deleted");
        self.publish(&docs, collection);
        Ok(())
    }

    async fn fetch_snapshot(&self, collection: &str) -> Result<Snapshot, RemoteError> {
        self.check_read()?;
        Ok(self
            .documents
            .lock()
            .await
            .render(collection, OrderKey::CreatedAt))
    }
}
