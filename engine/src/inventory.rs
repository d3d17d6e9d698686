//! Inventory - the in-memory authoritative item set.
//!
//! The inventory is replaced wholesale by remote snapshots while online and
//! edited in place by mutations while offline. It keeps item names unique
//! and quantities non-negative.

use crate::{
    error::Result, item::apply_delta, Applied, Error, Item, ItemId, Mutation, NewItem, OrderKey,
    Quantity, Snapshot, Timestamp,
};

/// The authoritative item set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Items in collection order
    items: Vec<Item>,
    /// Order maintained on insert
    order: OrderKey,
}

impl Inventory {
    /// Create an empty inventory ordered by creation time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inventory seeded from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut inventory = Self::new();
        inventory.replace(snapshot);
        inventory
    }

    /// Replace the whole set with a snapshot's items.
    pub fn replace(&mut self, snapshot: Snapshot) {
        self.items = snapshot.items;
    }

    /// All items in collection order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Get an item by id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Count of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the inventory has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Export the current set as a snapshot.
    pub fn to_snapshot(&self, observed_at: Timestamp) -> Snapshot {
        Snapshot::new(self.items.clone(), observed_at)
    }

    /// Apply a mutation locally.
    ///
    /// `mint_id` is only called when a new item has to be inserted.
    pub fn apply(
        &mut self,
        mutation: Mutation,
        now: Timestamp,
        mint_id: impl FnOnce() -> ItemId,
    ) -> Result<Applied> {
        match mutation {
            Mutation::AddOrMerge(fields) => self.add_or_merge(fields, now, mint_id),
            Mutation::SetQuantity { id, quantity } => self.set_quantity(&id, quantity),
            Mutation::AdjustQuantity { id, delta } => self.adjust_quantity(&id, delta),
            Mutation::Delete { id } => self.delete(&id),
        }
    }

    /// Insert `fields` as a new item, or merge into the item with the same name.
    pub fn add_or_merge(
        &mut self,
        fields: NewItem,
        now: Timestamp,
        mint_id: impl FnOnce() -> ItemId,
    ) -> Result<Applied> {
        fields.validate()?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.has_name(&fields.name)) {
            if fields.quantity == 0 {
                return Ok(Applied::Unchanged {
                    id: existing.id.clone(),
                });
            }
            existing.quantity = existing.quantity.saturating_add(fields.quantity);
            return Ok(Applied::QuantityChanged {
                id: existing.id.clone(),
                quantity: existing.quantity,
            });
        }

        let created_at = self.next_created_at(now);
        let item = Item::from_new(mint_id(), fields, created_at);
        let id = item.id.clone();
        self.insert_ordered(item);

        Ok(Applied::Inserted { id })
    }

    /// Set an absolute quantity.
    pub fn set_quantity(&mut self, id: &str, quantity: Quantity) -> Result<Applied> {
        let item = self.get_mut(id)?;
        if item.quantity == quantity {
            return Ok(Applied::Unchanged { id: item.id.clone() });
        }
        item.quantity = quantity;
        Ok(Applied::QuantityChanged {
            id: item.id.clone(),
            quantity,
        })
    }

    /// Apply a signed delta, clamping at zero.
    pub fn adjust_quantity(&mut self, id: &str, delta: i64) -> Result<Applied> {
        let current = self
            .get(id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?
            .quantity;
        self.set_quantity(id, apply_delta(current, delta))
    }

    /// Remove an item.
    pub fn delete(&mut self, id: &str) -> Result<Applied> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
        let removed = self.items.remove(index);
        Ok(Applied::Deleted { id: removed.id })
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Item> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))
    }

    /// Creation timestamps stay strictly increasing even if the wall clock
    /// does not.
    fn next_created_at(&self, now: Timestamp) -> Timestamp {
        self.items
            .iter()
            .map(|item| item.created_at.saturating_add(1))
            .max()
            .map_or(now, |floor| floor.max(now))
    }

    fn insert_ordered(&mut self, item: Item) {
        let order = self.order;
        let index = self
            .items
            .iter()
            .position(|existing| order.compare(&item, existing).is_lt())
            .unwrap_or(self.items.len());
        self.items.insert(index, item);
    }
}

/// Items whose category equals `category`; an empty category selects all.
pub fn filter_by_category<'a>(items: &'a [Item], category: &'a str) -> impl Iterator<Item = &'a Item> {
    items
        .iter()
        .filter(move |item| category.is_empty() || item.category == category)
}
