//! Snapshot types for persisting and exchanging whole collections.
//!
//! A snapshot is always a full replacement of a collection, never a patch.
//! It is the unit the remote subscription delivers and the unit the local
//! cache stores.

use crate::{error::Result, Error, Item, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Field a collection is ordered by. Ordering is always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderKey {
    /// Newest first (default)
    #[default]
    CreatedAt,
    /// Reverse lexicographic by name
    Name,
}

impl OrderKey {
    /// Compare two items so that sorting yields descending order.
    ///
    /// Ties are broken by id so the order is total and deterministic.
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let primary = match self {
            OrderKey::CreatedAt => b.created_at.cmp(&a.created_at),
            OrderKey::Name => b.name.cmp(&a.name),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }

    /// Sort items in place according to this key.
    pub fn sort(&self, items: &mut [Item]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

/// An immutable, whole-collection view taken at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Items in collection order
    pub items: Vec<Item>,
    /// When the snapshot was observed (milliseconds since epoch)
    pub observed_at: Timestamp,
}

impl Snapshot {
    /// Create a snapshot from already-ordered items.
    pub fn new(items: Vec<Item>, observed_at: Timestamp) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            items,
            observed_at,
        }
    }

    /// Create a snapshot with no items.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// Get an item by id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Find an item by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.has_name(name))
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the snapshot has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
