//! Unified error handling for the client.
//!
//! None of these errors are fatal. They are returned from the call that
//! caused them and, where no caller is waiting, published as
//! [`SyncEvent::Error`](crate::SyncEvent) on the coordinator's event channel.

use pantry_engine::ItemId;

/// Errors from the remote document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote read failed: {0}")]
    ReadFailed(String),

    #[error("remote write failed: {0}")]
    WriteFailed(String),

    #[error("document not found: {0}")]
    NotFound(ItemId),
}

/// Errors from the local key-value store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Error taxonomy surfaced by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("remote read failed: {0}")]
    RemoteReadFailed(String),

    #[error("remote write failed: {0}")]
    RemoteWriteFailed(String),

    #[error("cache unreadable: {0}")]
    CacheUnreadable(String),

    #[error("cache write failed: {0}")]
    CacheWriteFailed(String),

    #[error("failed to push quantity for {id}: {reason}")]
    ReconciliationPushFailed { id: ItemId, reason: String },

    #[error("Engine error: {0}")]
    Engine(#[from] pantry_engine::Error),

    #[error("client is offline; operation requires network connection")]
    Offline,

    #[error("coordinator has stopped")]
    Stopped,
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::ReadFailed(msg) => SyncError::RemoteReadFailed(msg),
            RemoteError::WriteFailed(msg) => SyncError::RemoteWriteFailed(msg),
            RemoteError::NotFound(id) => SyncError::Engine(pantry_engine::Error::ItemNotFound(id)),
        }
    }
}

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, SyncError>;
