//! Local snapshot cache.
//!
//! Snapshots are stored as JSON strings in a [`KeyValueStore`], one whole
//! value per key. A write replaces the previous value in a single step.

mod memory;
mod sqlite;

pub use memory::MemoryKeyValue;
pub use sqlite::SqliteKeyValue;

use crate::error::{CacheError, SyncError};
use async_trait::async_trait;
use pantry_engine::{DerivedEntry, Snapshot};

/// Durable string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

/// Typed snapshot persistence on top of a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct LocalCacheStore<K> {
    store: K,
}

impl<K: KeyValueStore> LocalCacheStore<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// Load the item snapshot under `key`.
    ///
    /// An absent key is `Ok(None)`. A value that cannot be read or decoded is
    /// reported as [`SyncError::CacheUnreadable`]; callers treat it as empty.
    pub async fn load(&self, key: &str) -> Result<Option<Snapshot>, SyncError> {
        let Some(raw) = self.read(key).await? else {
            return Ok(None);
        };
        Snapshot::from_json(&raw)
            .map(Some)
            .map_err(|e| unreadable(key, e.to_string()))
    }

    pub async fn save(&self, key: &str, snapshot: &Snapshot) -> Result<(), SyncError> {
        let json = snapshot
            .to_json()
            .map_err(|e| SyncError::CacheWriteFailed(e.to_string()))?;
        self.write(key, json).await
    }

    /// Load the restock list under `key`. Same contract as [`Self::load`].
    pub async fn load_restock(&self, key: &str) -> Result<Option<Vec<DerivedEntry>>, SyncError> {
        let Some(raw) = self.read(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| unreadable(key, e.to_string()))
    }

    pub async fn save_restock(&self, key: &str, entries: &[DerivedEntry]) -> Result<(), SyncError> {
        let json = serde_json::to_string(entries)
            .map_err(|e| SyncError::CacheWriteFailed(e.to_string()))?;
        self.write(key, json).await
    }

    async fn read(&self, key: &str) -> Result<Option<String>, SyncError> {
        self.store
            .get(key)
            .await
            .map_err(|e| unreadable(key, e.to_string()))
    }

    async fn write(&self, key: &str, value: String) -> Result<(), SyncError> {
        self.store.set(key, value).await.map_err(|e| {
            tracing::warn!(key, error = %e, "Cache write failed");
            SyncError::CacheWriteFailed(e.to_string())
        })
    }
}

fn unreadable(key: &str, reason: String) -> SyncError {
    tracing::warn!(key, error = %reason, "Cache entry unreadable");
    SyncError::CacheUnreadable(reason)
}
