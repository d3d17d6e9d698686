//! Item types for the inventory collection.

use crate::{error::Result, Error, ItemId, Quantity, Timestamp};
use serde::{Deserialize, Serialize};

/// An inventory item as stored in the remote collection and the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Identifier assigned on creation, stable for the item's lifetime
    pub id: ItemId,
    /// Display name, also the natural identity for merge-on-add
    pub name: String,
    /// Units on hand, never negative
    pub quantity: Quantity,
    /// Free-form category label
    pub category: String,
    /// Creation time (milliseconds since epoch), monotonic per store
    pub created_at: Timestamp,
}

impl Item {
    /// Create a new item.
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: Quantity,
        category: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity,
            category: category.into(),
            created_at,
        }
    }

    /// Build an item from creation fields and an assigned id.
    pub fn from_new(id: impl Into<ItemId>, fields: NewItem, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            name: fields.name,
            quantity: fields.quantity,
            category: fields.category,
            created_at,
        }
    }

    /// Whether this item is identified by `name`.
    pub fn has_name(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

/// Fields supplied when creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub quantity: Quantity,
}

impl NewItem {
    pub fn new(name: impl Into<String>, category: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            quantity,
        }
    }

    /// Reject blank names and categories.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidItem("name must not be blank".into()));
        }
        if self.category.trim().is_empty() {
            return Err(Error::InvalidItem("category must not be blank".into()));
        }
        Ok(())
    }
}

/// Name identity used everywhere an item or restock entry is matched by name.
///
/// Matching is case-insensitive for inserts, lookups and removals alike.
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Apply a signed delta to a quantity, clamping at zero.
pub fn apply_delta(quantity: Quantity, delta: i64) -> Quantity {
    let next = i64::from(quantity).saturating_add(delta);
    next.clamp(0, i64::from(Quantity::MAX)) as Quantity
}
