//! # Pantry Client
//!
//! Offline-tolerant inventory client. While online the remote document store
//! is authoritative and every snapshot it delivers replaces the local set.
//! While offline, edits land in a local cache. On reconnect the
//! [`Coordinator`] pushes offline quantities back (local wins), adopts
//! anything new on the server, and resubscribes.
//!
//! The pure rules live in [`pantry_engine`]; this crate provides the async
//! runtime around them:
//!
//! - [`ConnectivityMonitor`]: online/offline edges fed by the host
//! - [`RemoteStore`]: the remote collection API, with [`MemoryRemoteStore`]
//! - [`LocalCacheStore`]: snapshot persistence over a [`KeyValueStore`]
//! - [`Coordinator`] / [`CoordinatorHandle`]: the reconciliation actor
//!
//! ## Example
//!
//! ```no_run
//! use pantry_client::{
//!     Config, Connectivity, ConnectivityMonitor, Coordinator, LocalCacheStore,
//!     MemoryKeyValue, MemoryRemoteStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), pantry_client::SyncError> {
//! let monitor = ConnectivityMonitor::new(Connectivity::Online);
//! let handle = Coordinator::start(
//!     Config::default(),
//!     Arc::new(MemoryRemoteStore::new()),
//!     LocalCacheStore::new(MemoryKeyValue::new()),
//!     monitor.clone(),
//! )
//! .await;
//!
//! handle.add_or_merge_item("Milk", "Dairy", 2).await?;
//! monitor.report(Connectivity::Offline);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod remote;

pub use cache::{KeyValueStore, LocalCacheStore, MemoryKeyValue, SqliteKeyValue};
pub use config::{Config, ConfigError};
pub use connectivity::{Connectivity, ConnectivityMonitor, Transition};
pub use coordinator::{
    Coordinator, CoordinatorHandle, ReconcileReport, SyncEvent, SyncState, View,
};
pub use error::{CacheError, RemoteError, Result, SyncError};
pub use remote::{MemoryRemoteStore, RemoteStore, Subscription, SubscriptionHandle};

use pantry_engine::{ItemId, Timestamp};

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// A fresh document id.
pub(crate) fn new_id() -> ItemId {
    uuid::Uuid::new_v4().to_string()
}
