//! Error types for the Pantry engine.

use crate::ItemId;
use thiserror::Error;

/// All possible errors from the Pantry engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("invalid item: {0}")]
    InvalidItem(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
