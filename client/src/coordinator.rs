//! Reconciliation coordinator.
//!
//! A single actor task owns the authoritative item set and the restock list.
//! It reacts to connectivity edges, handle commands and subscription
//! deliveries one at a time, so a reconciliation never overlaps another one
//! and never interleaves with a mutation.
//!
//! ```text
//!            offline edge                    online edge
//! OnlineLive ────────────► OfflineCached ─────────────► Reconciling
//!     ▲                                                      │
//!     └──────────────────── pushes done, re-subscribed ──────┘
//! ```

use crate::cache::{KeyValueStore, LocalCacheStore};
use crate::config::Config;
use crate::connectivity::{Connectivity, ConnectivityMonitor, Transition};
use crate::error::{RemoteError, Result, SyncError};
use crate::remote::{RemoteStore, Subscription};
use crate::{new_id, now_millis};
use pantry_engine::{
    apply_delta, filter_by_category, names_match, reconcile, restock, Applied, DerivedEntry,
    Inventory, Item, ItemId, Mutation, NewItem, OrderKey, Quantity, RestockChange, RestockList,
    Snapshot,
};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Capacity of the command channel.
const COMMAND_CAPACITY: usize = 64;

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 256;

/// Which source the authoritative set currently follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    /// Subscribed; the remote store is authoritative.
    OnlineLive,
    /// Disconnected; the cache seeded the set and mutations stay local.
    OfflineCached,
    /// Pushing offline edits back after reconnecting.
    Reconciling,
}

/// Everything an observer needs, published as one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub state: SyncState,
    pub items: Arc<Vec<Item>>,
    pub restock: Arc<Vec<DerivedEntry>>,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Items whose local quantity was written back
    pub pushed: Vec<ItemId>,
    /// Items whose push failed; the server quantity was kept
    pub failed: Vec<ItemId>,
    /// Items that only existed on the server
    pub adopted: Vec<ItemId>,
    /// Items that only existed locally and were left unsynced
    pub local_only: Vec<ItemId>,
}

/// Notifications published on [`CoordinatorHandle::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Connectivity(Transition),
    Reconciled(ReconcileReport),
    Error(SyncError),
}

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Mutate {
        mutation: Mutation,
        reply: Reply<Applied>,
    },
    AddRestock {
        fields: NewItem,
        reply: Reply<bool>,
    },
    RemoveRestock {
        name: String,
        reply: Reply<usize>,
    },
    Refresh {
        reply: Reply<()>,
    },
    Resync {
        reply: Reply<ReconcileReport>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

enum Event {
    Transition(std::result::Result<Transition, broadcast::error::RecvError>),
    Command(Command),
    Items(Option<Snapshot>),
    Restock(Option<Snapshot>),
    Closed,
}

/// The coordinator actor.
pub struct Coordinator<R, K> {
    config: Config,
    remote: Arc<R>,
    cache: LocalCacheStore<K>,
    monitor: ConnectivityMonitor,
    transitions: broadcast::Receiver<Transition>,
    commands: mpsc::Receiver<Command>,
    view: watch::Sender<View>,
    events: broadcast::Sender<SyncEvent>,
    state: SyncState,
    inventory: Inventory,
    restock: RestockList,
    items_sub: Option<Subscription>,
    restock_sub: Option<Subscription>,
}

impl<R: RemoteStore, K: KeyValueStore> Coordinator<R, K> {
    /// Seed the coordinator and spawn its task.
    ///
    /// Starts from the cache, then subscribes if the monitor reports online.
    /// No reconciliation runs at startup.
    pub async fn start(
        config: Config,
        remote: Arc<R>,
        cache: LocalCacheStore<K>,
        monitor: ConnectivityMonitor,
    ) -> CoordinatorHandle {
        let transitions = monitor.subscribe();
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (view, view_rx) = watch::channel(View {
            state: SyncState::OfflineCached,
            items: Arc::default(),
            restock: Arc::default(),
        });

        let mut coordinator = Self {
            config,
            remote,
            cache,
            monitor,
            transitions,
            commands,
            view,
            events: events.clone(),
            state: SyncState::OfflineCached,
            inventory: Inventory::new(),
            restock: RestockList::new(),
            items_sub: None,
            restock_sub: None,
        };

        coordinator.load_cached().await;
        if coordinator.monitor.is_online() {
            if let Err(err) = coordinator.go_live().await {
                coordinator.report(err);
            }
        }
        if coordinator.state == SyncState::OfflineCached {
            coordinator.derive_offline().await;
        }
        coordinator.publish();

        tracing::info!(state = ?coordinator.state, "Coordinator started");
        tokio::spawn(coordinator.run());

        CoordinatorHandle {
            commands: command_tx,
            view: view_rx,
            events,
        }
    }

    /// Deliveries already queued by the store are applied before the next
    /// command, so online commands always see the latest remote state.
    async fn run(mut self) {
        loop {
            let event = tokio::select! {
                biased;
                transition = self.transitions.recv() => Event::Transition(transition),
                snapshot = next_snapshot(&mut self.restock_sub) => Event::Restock(snapshot),
                snapshot = next_snapshot(&mut self.items_sub) => Event::Items(snapshot),
                command = self.commands.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::Closed,
                },
            };

            match event {
                Event::Transition(Ok(transition)) => {
                    self.emit(SyncEvent::Connectivity(transition));
                    self.follow_connectivity().await;
                }
                Event::Transition(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "Missed connectivity edges");
                    self.follow_connectivity().await;
                }
                Event::Transition(Err(broadcast::error::RecvError::Closed)) => break,
                Event::Command(command) => {
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }
                Event::Restock(Some(snapshot)) => self.accept_restock(snapshot).await,
                Event::Items(Some(snapshot)) => self.accept_items(snapshot).await,
                Event::Restock(None) => {
                    tracing::warn!("Restock subscription closed by remote");
                    self.restock_sub = None;
                }
                Event::Items(None) => {
                    tracing::warn!("Item subscription closed by remote");
                    self.items_sub = None;
                }
                Event::Closed => {
                    self.teardown();
                    break;
                }
            }
        }

        tracing::info!("Coordinator stopped");
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Mutate { mutation, reply } => {
                let result = self.mutate(mutation).await;
                let _ = reply.send(result);
            }
            Command::AddRestock { fields, reply } => {
                let result = self.add_restock(fields).await;
                let _ = reply.send(result);
            }
            Command::RemoveRestock { name, reply } => {
                let result = self.remove_restock(&name).await;
                let _ = reply.send(result);
            }
            Command::Refresh { reply } => {
                let result = self.refresh().await;
                let _ = reply.send(result);
            }
            Command::Resync { reply } => {
                let result = self.resync().await;
                let _ = reply.send(result);
            }
            Command::Shutdown { reply } => {
                self.teardown();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // Connectivity

    /// Move towards the monitor's current status. Edges that arrive while
    /// reconciling are folded into a single check afterwards.
    async fn follow_connectivity(&mut self) {
        match (self.monitor.status(), self.state) {
            (Connectivity::Online, SyncState::OfflineCached) => {
                let _ = self.reconcile().await;
                self.drain_transitions();
                if !self.monitor.is_online() && self.state == SyncState::OnlineLive {
                    self.go_offline().await;
                }
            }
            (Connectivity::Offline, SyncState::OnlineLive) => self.go_offline().await,
            _ => {}
        }
    }

    fn drain_transitions(&mut self) {
        loop {
            match self.transitions.try_recv() {
                Ok(transition) => self.emit(SyncEvent::Connectivity(transition)),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    async fn go_offline(&mut self) {
        self.teardown();
        self.state = SyncState::OfflineCached;
        self.load_cached().await;
        self.derive_offline().await;
        self.publish();
        tracing::info!(items = self.inventory.len(), "Offline; serving cached set");
    }

    /// Subscribe to both collections and apply their first snapshots.
    async fn go_live(&mut self) -> Result<()> {
        let mut restock_sub = self
            .remote
            .subscribe(&self.config.restock_collection, OrderKey::CreatedAt)
            .await?;
        let mut items_sub = match self
            .remote
            .subscribe(&self.config.items_collection, OrderKey::CreatedAt)
            .await
        {
            Ok(sub) => sub,
            Err(err) => {
                self.remote.unsubscribe(restock_sub.handle());
                return Err(err.into());
            }
        };

        self.state = SyncState::OnlineLive;
        if let Some(snapshot) = restock_sub.next().await {
            self.accept_restock(snapshot).await;
        }
        if let Some(snapshot) = items_sub.next().await {
            self.accept_items(snapshot).await;
        }
        self.restock_sub = Some(restock_sub);
        self.items_sub = Some(items_sub);

        tracing::info!(
            items = %self.config.items_collection,
            restock = %self.config.restock_collection,
            "Subscribed to remote collections"
        );
        Ok(())
    }

    fn teardown(&mut self) {
        for sub in [self.items_sub.take(), self.restock_sub.take()]
            .into_iter()
            .flatten()
        {
            self.remote.unsubscribe(sub.handle());
        }
    }

    // Reconciliation

    async fn reconcile(&mut self) -> Result<ReconcileReport> {
        self.state = SyncState::Reconciling;
        self.publish();
        tracing::info!("Reconciling with remote store");

        match self.fetch_server().await {
            Ok(server) => self.reconcile_with(server).await,
            Err(err) => {
                self.state = SyncState::OfflineCached;
                self.publish();
                Err(err)
            }
        }
    }

    /// Push offline quantities against an already fetched server snapshot,
    /// then resubscribe.
    async fn reconcile_with(&mut self, server: Snapshot) -> Result<ReconcileReport> {
        self.state = SyncState::Reconciling;
        self.publish();

        let local = self.cached_items().await;
        let plan = reconcile::plan(&local, &server);

        for id in &plan.local_only {
            tracing::warn!(id = %id, "Item exists only locally and is not pushed");
        }

        let mut pushed = Vec::new();
        let mut failed = Vec::new();
        for push in &plan.pushes {
            match self
                .remote
                .update_quantity(&self.config.items_collection, &push.id, push.local_quantity)
                .await
            {
                Ok(()) => {
                    tracing::debug!(
                        id = %push.id,
                        from = push.remote_quantity,
                        to = push.local_quantity,
                        "Pushed local quantity"
                    );
                    pushed.push(push);
                }
                Err(err) => {
                    failed.push(push.id.clone());
                    self.report(SyncError::ReconciliationPushFailed {
                        id: push.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let merged = reconcile::merge(&server, pushed.iter().copied());
        let report = ReconcileReport {
            pushed: pushed.iter().map(|push| push.id.clone()).collect(),
            failed,
            adopted: plan.adopted.clone(),
            local_only: plan.local_only.clone(),
        };

        self.inventory.replace(Snapshot::new(merged, now_millis()));
        self.persist_items().await;

        if let Err(err) = self.go_live().await {
            self.state = SyncState::OfflineCached;
            self.publish();
            return Err(self.report(err));
        }

        tracing::info!(
            pushed = report.pushed.len(),
            failed = report.failed.len(),
            adopted = report.adopted.len(),
            local_only = report.local_only.len(),
            "Reconciliation complete"
        );
        self.emit(SyncEvent::Reconciled(report.clone()));
        Ok(report)
    }

    /// The live subscriptions are only dropped once the server snapshot is
    /// in hand; a failed fetch leaves the current state untouched.
    async fn resync(&mut self) -> Result<ReconcileReport> {
        if !self.monitor.is_online() {
            return Err(SyncError::Offline);
        }
        let server = self.fetch_server().await?;
        self.teardown();
        self.reconcile_with(server).await
    }

    /// A connect that failed leaves the monitor online while the set is still
    /// the cached one. Retry it before serving a command, and refuse the
    /// command if the remote store is still unreachable.
    async fn catch_up(&mut self) -> Result<()> {
        if self.monitor.is_online() && self.state == SyncState::OfflineCached {
            tracing::info!("Online but not subscribed; retrying reconciliation");
            self.reconcile().await?;
        }
        Ok(())
    }

    async fn fetch_server(&self) -> Result<Snapshot> {
        self.remote
            .fetch_snapshot(&self.config.items_collection)
            .await
            .map_err(|err| self.report(err.into()))
    }

    async fn refresh(&mut self) -> Result<()> {
        self.catch_up().await?;
        if self.state != SyncState::OnlineLive {
            return Err(SyncError::Offline);
        }
        let items = self
            .remote
            .fetch_snapshot(&self.config.items_collection)
            .await?;
        let restock = self
            .remote
            .fetch_snapshot(&self.config.restock_collection)
            .await?;

        self.accept_restock(restock).await;
        self.accept_items(items).await;
        Ok(())
    }

    // Item mutations

    async fn mutate(&mut self, mutation: Mutation) -> Result<Applied> {
        self.catch_up().await?;
        tracing::debug!(
            kind = mutation.kind(),
            id = ?mutation.item_id(),
            state = ?self.state,
            "Applying mutation"
        );
        if self.state == SyncState::OnlineLive {
            return self.mutate_remote(mutation).await;
        }

        let applied = self.inventory.apply(mutation, now_millis(), new_id)?;
        if applied.is_change() {
            self.persist_items().await;
            self.derive_offline().await;
            self.publish();
        }
        Ok(applied)
    }

    /// Online mutations are sent to the remote store only; the set changes
    /// when the subscription delivers the result.
    async fn mutate_remote(&self, mutation: Mutation) -> Result<Applied> {
        let collection = &self.config.items_collection;
        match mutation {
            Mutation::AddOrMerge(fields) => {
                fields.validate()?;
                let existing = self.remote.find_by_name(collection, &fields.name).await?;
                match existing {
                    Some(existing) if fields.quantity == 0 => {
                        Ok(Applied::Unchanged { id: existing.id })
                    }
                    Some(existing) => {
                        let quantity = existing.quantity.saturating_add(fields.quantity);
                        self.remote
                            .update_quantity(collection, &existing.id, quantity)
                            .await?;
                        Ok(Applied::QuantityChanged {
                            id: existing.id,
                            quantity,
                        })
                    }
                    None => {
                        let id = self.remote.create(collection, fields).await?;
                        Ok(Applied::Inserted { id })
                    }
                }
            }
            Mutation::SetQuantity { id, quantity } => {
                self.remote.update_quantity(collection, &id, quantity).await?;
                Ok(Applied::QuantityChanged { id, quantity })
            }
            Mutation::AdjustQuantity { id, delta } => {
                let current = self
                    .inventory
                    .get(&id)
                    .ok_or_else(|| pantry_engine::Error::ItemNotFound(id.clone()))?
                    .quantity;
                let quantity = apply_delta(current, delta);
                if quantity == current {
                    return Ok(Applied::Unchanged { id });
                }
                self.remote.update_quantity(collection, &id, quantity).await?;
                Ok(Applied::QuantityChanged { id, quantity })
            }
            Mutation::Delete { id } => {
                self.remote.delete(collection, &id).await?;
                Ok(Applied::Deleted { id })
            }
        }
    }

    // Restock list

    async fn derive_online(&self) {
        let changes = restock::derive(
            self.inventory.items(),
            self.restock.entries(),
            self.config.depletion_threshold,
        );
        let collection = &self.config.restock_collection;

        for change in changes {
            match change {
                RestockChange::Insert(fields) => {
                    match self.remote.find_by_name(collection, &fields.name).await {
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            let name = fields.name.clone();
                            match self.remote.create(collection, fields).await {
                                Ok(_) => tracing::info!(name = %name, "Added to restock list"),
                                Err(err) => {
                                    self.report(err.into());
                                }
                            }
                        }
                        Err(err) => {
                            self.report(err.into());
                        }
                    }
                }
                RestockChange::Remove { id, name } => {
                    match self.remote.delete(collection, &id).await {
                        Ok(()) | Err(RemoteError::NotFound(_)) => {
                            tracing::info!(name = %name, "Removed from restock list");
                        }
                        Err(err) => {
                            self.report(err.into());
                        }
                    }
                }
            }
        }
    }

    async fn derive_offline(&mut self) {
        let changes = restock::derive(
            self.inventory.items(),
            self.restock.entries(),
            self.config.depletion_threshold,
        );
        if changes.is_empty() {
            return;
        }
        for change in changes {
            self.restock.apply(change, new_id);
        }
        self.persist_restock().await;
    }

    async fn add_restock(&mut self, fields: NewItem) -> Result<bool> {
        restock::validate_manual(&fields)?;
        self.catch_up().await?;

        if self.state == SyncState::OnlineLive {
            let collection = &self.config.restock_collection;
            if self.remote.find_by_name(collection, &fields.name).await?.is_some() {
                return Ok(false);
            }
            self.remote.create(collection, fields).await?;
            return Ok(true);
        }

        let added = self.restock.insert(DerivedEntry::from_new(new_id(), fields));
        if added {
            self.persist_restock().await;
            self.publish();
        }
        Ok(added)
    }

    async fn remove_restock(&mut self, name: &str) -> Result<usize> {
        self.catch_up().await?;
        let mut removed_remote = None;

        if self.state == SyncState::OnlineLive {
            let collection = &self.config.restock_collection;
            let snapshot = self.remote.fetch_snapshot(collection).await?;
            let targets: Vec<&Item> = snapshot
                .items
                .iter()
                .filter(|entry| names_match(&entry.name, name))
                .collect();

            let results = futures::future::join_all(
                targets
                    .iter()
                    .map(|entry| self.remote.delete(collection, &entry.id)),
            )
            .await;

            let mut count = 0;
            for result in results {
                match result {
                    Ok(()) | Err(RemoteError::NotFound(_)) => count += 1,
                    Err(err) => return Err(err.into()),
                }
            }
            removed_remote = Some(count);
        }

        let removed_local = self.restock.remove_named(name).len();
        self.persist_restock().await;
        self.publish();

        Ok(removed_remote.unwrap_or(removed_local))
    }

    // Snapshot intake

    async fn accept_items(&mut self, snapshot: Snapshot) {
        tracing::debug!(items = snapshot.len(), "Item snapshot received");
        self.inventory.replace(snapshot);
        self.persist_items().await;
        self.publish();
        self.derive_online().await;
    }

    async fn accept_restock(&mut self, snapshot: Snapshot) {
        let received = snapshot.len();
        self.restock =
            RestockList::from_entries(snapshot.items.into_iter().map(DerivedEntry::from));
        if self.restock.len() != received {
            tracing::debug!(
                received,
                kept = self.restock.len(),
                "Dropped duplicate restock entries"
            );
        }
        self.persist_restock().await;
        self.publish();
    }

    // Cache

    async fn load_cached(&mut self) {
        let items = self.cached_items().await;
        self.inventory.replace(items);

        let entries = match self.cache.load_restock(&self.config.restock_cache_key).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                self.report(err);
                Vec::new()
            }
        };
        self.restock = RestockList::from_entries(entries);
    }

    async fn cached_items(&self) -> Snapshot {
        match self.cache.load(&self.config.items_cache_key).await {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(err) => {
                self.report(err);
                Snapshot::empty()
            }
        }
    }

    async fn persist_items(&self) {
        let snapshot = self.inventory.to_snapshot(now_millis());
        if let Err(err) = self.cache.save(&self.config.items_cache_key, &snapshot).await {
            self.report(err);
        }
    }

    async fn persist_restock(&self) {
        if let Err(err) = self
            .cache
            .save_restock(&self.config.restock_cache_key, self.restock.entries())
            .await
        {
            self.report(err);
        }
    }

    // Publication

    fn publish(&self) {
        self.view.send_replace(View {
            state: self.state,
            items: Arc::new(self.inventory.items().to_vec()),
            restock: Arc::new(self.restock.entries().to_vec()),
        });
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn report(&self, err: SyncError) -> SyncError {
        tracing::warn!(error = %err, "Sync error");
        self.emit(SyncEvent::Error(err.clone()));
        err
    }
}

async fn next_snapshot(sub: &mut Option<Subscription>) -> Option<Snapshot> {
    match sub {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

/// Cloneable front end to a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<View>,
    events: broadcast::Sender<SyncEvent>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Mutate { .. } => "Mutate",
            Command::AddRestock { .. } => "AddRestock",
            Command::RemoveRestock { .. } => "RemoveRestock",
            Command::Refresh { .. } => "Refresh",
            Command::Resync { .. } => "Resync",
            Command::Shutdown { .. } => "Shutdown",
        };
        f.write_str(name)
    }
}

impl CoordinatorHandle {
    /// The current authoritative item set.
    pub fn items(&self) -> Vec<Item> {
        self.view.borrow().items.to_vec()
    }

    /// Items in `category`; an empty category returns everything.
    pub fn items_in_category(&self, category: &str) -> Vec<Item> {
        let view = self.view.borrow();
        filter_by_category(&view.items, category).cloned().collect()
    }

    /// The current restock list.
    pub fn restock(&self) -> Vec<DerivedEntry> {
        self.view.borrow().restock.to_vec()
    }

    /// Restock entries whose name contains `query`.
    pub fn search_restock(&self, query: &str) -> Vec<DerivedEntry> {
        let view = self.view.borrow();
        pantry_engine::search_restock(&view.restock, query)
            .cloned()
            .collect()
    }

    pub fn state(&self) -> SyncState {
        self.view.borrow().state
    }

    /// State, items and restock list as one consistent value.
    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    /// Watch for new views.
    pub fn watch(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Add an item, or add `quantity` to the item with the same name.
    pub async fn add_or_merge_item(
        &self,
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: Quantity,
    ) -> Result<Applied> {
        let mutation = Mutation::AddOrMerge(NewItem::new(name, category, quantity));
        self.request(|reply| Command::Mutate { mutation, reply })
            .await
    }

    pub async fn set_quantity(&self, id: impl Into<ItemId>, quantity: Quantity) -> Result<Applied> {
        let mutation = Mutation::SetQuantity {
            id: id.into(),
            quantity,
        };
        self.request(|reply| Command::Mutate { mutation, reply })
            .await
    }

    /// Change a quantity by `delta`, stopping at zero.
    pub async fn adjust_quantity(&self, id: impl Into<ItemId>, delta: i64) -> Result<Applied> {
        let mutation = Mutation::AdjustQuantity {
            id: id.into(),
            delta,
        };
        self.request(|reply| Command::Mutate { mutation, reply })
            .await
    }

    pub async fn delete_item(&self, id: impl Into<ItemId>) -> Result<Applied> {
        let mutation = Mutation::Delete { id: id.into() };
        self.request(|reply| Command::Mutate { mutation, reply })
            .await
    }

    /// Add a restock entry by hand. Returns `false` if the name is already
    /// listed.
    pub async fn add_restock_entry(
        &self,
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: Quantity,
    ) -> Result<bool> {
        let fields = NewItem::new(name, category, quantity);
        self.request(|reply| Command::AddRestock { fields, reply })
            .await
    }

    /// Remove every restock entry named `name`. Returns how many went.
    pub async fn remove_restock_entry(&self, name: impl Into<String>) -> Result<usize> {
        let name = name.into();
        self.request(|reply| Command::RemoveRestock { name, reply })
            .await
    }

    /// Re-read both collections from the remote store. Online only.
    pub async fn refresh(&self) -> Result<()> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    /// Run reconciliation now. Online only.
    pub async fn resync(&self) -> Result<ReconcileReport> {
        self.request(|reply| Command::Resync { reply }).await
    }

    /// Stop the coordinator and drop its subscriptions.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| SyncError::Stopped)?;
        done.await.map_err(|_| SyncError::Stopped)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SyncError::Stopped)?;
        response.await.map_err(|_| SyncError::Stopped)?
    }
}
