//! # Pantry Engine
//!
//! Deterministic core of the Pantry inventory client.
//!
//! This crate holds the logic that decides what the locally visible item set
//! is, which side wins when the client reconnects, and which items belong on
//! the restock list. The same inputs always produce the same outputs.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about the network, the cache or time
//! - **Deterministic**: timestamps and ids are passed in by the caller
//! - **Testable**: pure functions over plain data
//!
//! ## Core Concepts
//!
//! ### Items and snapshots
//!
//! An [`Item`] is a named, quantified inventory record. A [`Snapshot`] is a
//! whole-collection view; the remote store delivers snapshots and the local
//! cache persists them.
//!
//! ### Inventory
//!
//! The [`Inventory`] is the authoritative set. It is replaced wholesale by
//! snapshots and edited by [`Mutation`]s while offline. Names are unique
//! (case-insensitive) and quantities never drop below zero.
//!
//! ### Reconciliation
//!
//! [`reconcile::plan`] compares the offline snapshot with a fresh server
//! snapshot. Local quantities win; server-only items are adopted; local-only
//! items are reported.
//!
//! ### Restock list
//!
//! [`restock::derive`] keeps exactly one [`DerivedEntry`] per depleted item.
//!
//! ## Quick Start
//!
//! ```rust
//! use pantry_engine::{reconcile, Inventory, Item, Mutation, NewItem, Snapshot};
//!
//! // 1. Seed the authoritative set from a cached snapshot
//! let cached = Snapshot::new(vec![Item::new("1", "Milk", 5, "Dairy", 1000)], 1000);
//! let mut inventory = Inventory::from_snapshot(cached);
//!
//! // 2. Edit while offline
//! inventory
//!     .apply(Mutation::AdjustQuantity { id: "1".into(), delta: -3 }, 2000, || unreachable!())
//!     .unwrap();
//! inventory
//!     .apply(Mutation::AddOrMerge(NewItem::new("milk", "Dairy", 1)), 2000, || unreachable!())
//!     .unwrap();
//! assert_eq!(inventory.get("1").unwrap().quantity, 3);
//!
//! // 3. Reconnect: the local quantity is pushed
//! let server = Snapshot::new(vec![Item::new("1", "Milk", 5, "Dairy", 1000)], 3000);
//! let plan = reconcile::plan(&inventory.to_snapshot(2000), &server);
//! assert_eq!(plan.pushes.len(), 1);
//! assert_eq!(plan.pushes[0].local_quantity, 3);
//! ```

pub mod error;
pub mod inventory;
pub mod item;
pub mod mutation;
pub mod reconcile;
pub mod restock;
pub mod snapshot;

// Re-export main types at crate root
pub use error::Error;
pub use inventory::{filter_by_category, Inventory};
pub use item::{apply_delta, names_match, Item, NewItem};
pub use mutation::{Applied, Mutation};
pub use reconcile::{QuantityPush, ReconcilePlan};
pub use restock::{
    search_restock, DepletionThreshold, DerivedEntry, RestockChange, RestockList,
};
pub use snapshot::{OrderKey, Snapshot, SNAPSHOT_FORMAT_VERSION};

/// Type aliases for clarity
pub type ItemId = String;
pub type CollectionName = String;
pub type Quantity = u32;
pub type Timestamp = u64;
