//! Restock list derivation.
//!
//! The restock list (shopping list) mirrors every depleted item of the
//! authoritative set. It is recomputed after each change to that set; the
//! result is a list of [`RestockChange`]s that bring the current entries in
//! line. Deriving again on an unchanged set yields no changes.

use crate::{error::Result, item::names_match, Error, Item, ItemId, NewItem, Quantity};
use serde::{Deserialize, Serialize};

/// Quantity at or below which an item counts as depleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepletionThreshold(pub Quantity);

impl DepletionThreshold {
    pub fn new(threshold: Quantity) -> Self {
        Self(threshold)
    }

    pub fn is_depleted(&self, quantity: Quantity) -> bool {
        quantity <= self.0
    }
}

/// An entry of the restock list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedEntry {
    pub id: ItemId,
    pub name: String,
    pub quantity: Quantity,
    pub category: String,
}

impl DerivedEntry {
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: Quantity,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity,
            category: category.into(),
        }
    }

    pub fn from_new(id: impl Into<ItemId>, fields: NewItem) -> Self {
        Self::new(id, fields.name, fields.quantity, fields.category)
    }
}

impl From<Item> for DerivedEntry {
    fn from(item: Item) -> Self {
        Self::new(item.id, item.name, item.quantity, item.category)
    }
}

/// A single edit to the restock list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RestockChange {
    /// Add an entry for a newly depleted item
    Insert(NewItem),
    /// Remove an entry that is no longer needed or is a duplicate
    Remove { id: ItemId, name: String },
}

/// Compute the changes that make `entries` mirror the depleted `items`.
///
/// * A depleted item with no entry gets one.
/// * A depleted item with several entries keeps the first.
/// * An item above the threshold loses every entry with its name.
/// * Entries whose name matches no item (manual additions) are untouched.
pub fn derive(
    items: &[Item],
    entries: &[DerivedEntry],
    threshold: DepletionThreshold,
) -> Vec<RestockChange> {
    let mut changes = Vec::new();
    let mut seen: Vec<&str> = Vec::new();

    for item in items {
        if seen.iter().any(|name| names_match(name, &item.name)) {
            continue;
        }
        seen.push(&item.name);

        let mut matching = entries.iter().filter(|e| names_match(&e.name, &item.name));

        // A depleted item keeps its first entry; everything left in
        // `matching` afterwards is removed.
        if threshold.is_depleted(item.quantity) && matching.next().is_none() {
            changes.push(RestockChange::Insert(NewItem::new(
                item.name.clone(),
                item.category.clone(),
                item.quantity,
            )));
        }

        changes.extend(matching.map(|entry| RestockChange::Remove {
            id: entry.id.clone(),
            name: entry.name.clone(),
        }));
    }

    changes
}

/// Validate an entry added by hand.
pub fn validate_manual(fields: &NewItem) -> Result<()> {
    fields.validate()?;
    if fields.quantity == 0 {
        return Err(Error::InvalidItem("quantity must be positive".into()));
    }
    Ok(())
}

/// Entries whose name contains `query` (case-insensitive).
pub fn search_restock<'a>(
    entries: &'a [DerivedEntry],
    query: &str,
) -> impl Iterator<Item = &'a DerivedEntry> {
    let query = query.to_lowercase();
    entries
        .iter()
        .filter(move |entry| entry.name.to_lowercase().contains(&query))
}

/// The local copy of the restock list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestockList {
    entries: Vec<DerivedEntry>,
}

impl RestockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list, keeping only the first entry for each name.
    pub fn from_entries(entries: impl IntoIterator<Item = DerivedEntry>) -> Self {
        let mut list = Self::new();
        for entry in entries {
            if list.find(&entry.name).is_none() {
                list.entries.push(entry);
            }
        }
        list
    }

    pub fn entries(&self) -> &[DerivedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&DerivedEntry> {
        self.entries.iter().find(|e| names_match(&e.name, name))
    }

    /// Add an entry unless one with the same name exists.
    ///
    /// Returns whether the entry was added.
    pub fn insert(&mut self, entry: DerivedEntry) -> bool {
        if self.find(&entry.name).is_some() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Remove every entry with `name`, returning the removed entries.
    pub fn remove_named(&mut self, name: &str) -> Vec<DerivedEntry> {
        let (removed, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| names_match(&e.name, name));
        self.entries = kept;
        removed
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn remove_id(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Apply a derived change locally.
    ///
    /// `mint_id` is only called for inserts.
    pub fn apply(&mut self, change: RestockChange, mint_id: impl FnOnce() -> ItemId) -> bool {
        match change {
            RestockChange::Insert(fields) => self.insert(DerivedEntry::from_new(mint_id(), fields)),
            RestockChange::Remove { id, .. } => self.remove_id(&id),
        }
    }
}
