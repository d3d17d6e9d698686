//! Mutation types for expressing changes to the authoritative set.
//!
//! User requests are expressed as mutations rather than direct edits, so the
//! same request can be routed to the remote store while online or applied to
//! the local set while offline.

use crate::{ItemId, NewItem, Quantity};
use serde::{Deserialize, Serialize};

/// A user-initiated change to the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Insert a new item, or add to the quantity of the item with the same name
    AddOrMerge(NewItem),
    /// Set an absolute quantity
    SetQuantity { id: ItemId, quantity: Quantity },
    /// Apply a signed delta, clamped at zero
    AdjustQuantity { id: ItemId, delta: i64 },
    /// Remove an item
    Delete { id: ItemId },
}

impl Mutation {
    /// Get the item id this mutation targets, if it targets an existing item.
    pub fn item_id(&self) -> Option<&ItemId> {
        match self {
            Mutation::AddOrMerge(_) => None,
            Mutation::SetQuantity { id, .. } => Some(id),
            Mutation::AdjustQuantity { id, .. } => Some(id),
            Mutation::Delete { id } => Some(id),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::AddOrMerge(_) => "add_or_merge",
            Mutation::SetQuantity { .. } => "set_quantity",
            Mutation::AdjustQuantity { .. } => "adjust_quantity",
            Mutation::Delete { .. } => "delete",
        }
    }
}

/// What applying a mutation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Applied {
    /// A new item was inserted
    Inserted { id: ItemId },
    /// An existing item's quantity changed (merge-on-add, set or adjust)
    QuantityChanged { id: ItemId, quantity: Quantity },
    /// The request left the item as it was (e.g. setting the same quantity)
    Unchanged { id: ItemId },
    /// The item was removed
    Deleted { id: ItemId },
}

impl Applied {
    /// Whether the authoritative set changed.
    pub fn is_change(&self) -> bool {
        !matches!(self, Applied::Unchanged { .. })
    }
}
