//! Reconciliation planning for the offline → online transition.
//!
//! Given the last snapshot the client cached while offline and a fresh
//! snapshot from the remote store, this module decides which quantities must
//! be pushed back and what the merged authoritative set looks like.
//!
//! # Policy
//!
//! 1. Items are matched by id.
//! 2. For an item present on both sides with differing quantities, the local
//!    quantity wins unconditionally (single offline editor).
//! 3. Items only on the server are adopted as they are.
//! 4. Items only in the local set are reported but not pushed.
//!
//! The planner is pure; the caller performs the writes and then calls
//! [`merge`] with the pushes that actually succeeded.

use crate::{Item, ItemId, Quantity, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A quantity that must be written back to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityPush {
    /// Item to update
    pub id: ItemId,
    /// Item name, for reporting
    pub name: String,
    /// Quantity in the local (offline) set; this is what gets written
    pub local_quantity: Quantity,
    /// Quantity the server currently holds
    pub remote_quantity: Quantity,
}

/// The writes and classifications derived from comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePlan {
    /// Quantities to push, in server order
    pub pushes: Vec<QuantityPush>,
    /// Items that exist only on the server
    pub adopted: Vec<ItemId>,
    /// Items that exist only locally; left unsynced
    pub local_only: Vec<ItemId>,
}

impl ReconcilePlan {
    /// True when reconciliation needs no remote writes.
    pub fn is_noop(&self) -> bool {
        self.pushes.is_empty()
    }
}

/// Compare the offline snapshot against the server snapshot.
pub fn plan(local: &Snapshot, server: &Snapshot) -> ReconcilePlan {
    let local_by_id: HashMap<&str, &Item> = local
        .items
        .iter()
        .map(|item| (item.id.as_str(), item))
        .collect();

    let mut plan = ReconcilePlan::default();

    for remote in &server.items {
        match local_by_id.get(remote.id.as_str()) {
            Some(local) if local.quantity != remote.quantity => {
                plan.pushes.push(QuantityPush {
                    id: remote.id.clone(),
                    name: remote.name.clone(),
                    local_quantity: local.quantity,
                    remote_quantity: remote.quantity,
                });
            }
            Some(_) => {}
            None => plan.adopted.push(remote.id.clone()),
        }
    }

    plan.local_only = local
        .items
        .iter()
        .filter(|item| server.get(&item.id).is_none())
        .map(|item| item.id.clone())
        .collect();

    plan
}

/// Build the post-reconciliation set: the server's items with every
/// successfully pushed quantity overridden.
pub fn merge<'a>(server: &Snapshot, pushed: impl IntoIterator<Item = &'a QuantityPush>) -> Vec<Item> {
    let overrides: HashMap<&str, Quantity> = pushed
        .into_iter()
        .map(|push| (push.id.as_str(), push.local_quantity))
        .collect();

    server
        .items
        .iter()
        .map(|item| match overrides.get(item.id.as_str()) {
            Some(&quantity) => Item {
                quantity,
                ..item.clone()
            },
            None => item.clone(),
        })
        .collect()
}
