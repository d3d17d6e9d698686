//! Integration tests for the reconciliation coordinator.
//!
//! Each test drives a coordinator against the in-memory remote store and an
//! in-memory cache. Any handle command doubles as a barrier: the actor applies
//! every delivery already queued before it serves the next command.

use pantry_client::{
    Config, Connectivity, ConnectivityMonitor, Coordinator, CoordinatorHandle, KeyValueStore,
    LocalCacheStore, MemoryKeyValue, MemoryRemoteStore, ReconcileReport, RemoteStore, SyncError,
    SyncEvent, SyncState,
};
use pantry_engine::{Applied, DepletionThreshold, Error as EngineError, Item, NewItem, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

const ITEMS: &str = "items";
const RESTOCK: &str = "shopping-list";
const WAIT: Duration = Duration::from_secs(5);

fn milk(quantity: u32) -> Item {
    Item::new("milk", "Milk", quantity, "Dairy", 1_000)
}

fn eggs(quantity: u32) -> Item {
    Item::new("eggs", "Eggs", quantity, "Dairy", 2_000)
}

struct Harness {
    remote: Arc<MemoryRemoteStore>,
    kv: MemoryKeyValue,
    monitor: ConnectivityMonitor,
    handle: CoordinatorHandle,
    events: broadcast::Receiver<SyncEvent>,
}

impl Harness {
    async fn online(items: Vec<Item>) -> Self {
        Self::start(Config::default(), items, MemoryKeyValue::new(), Connectivity::Online).await
    }

    async fn start(
        config: Config,
        items: Vec<Item>,
        kv: MemoryKeyValue,
        connectivity: Connectivity,
    ) -> Self {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.seed(ITEMS, items).await;
        Self::start_on(remote, config, kv, connectivity).await
    }

    async fn start_on(
        remote: Arc<MemoryRemoteStore>,
        config: Config,
        kv: MemoryKeyValue,
        connectivity: Connectivity,
    ) -> Self {
        let monitor = ConnectivityMonitor::new(connectivity);
        let handle = Coordinator::start(
            config,
            remote.clone(),
            LocalCacheStore::new(kv.clone()),
            monitor.clone(),
        )
        .await;
        let events = handle.events();

        Self {
            remote,
            kv,
            monitor,
            handle,
            events,
        }
    }

    /// Round-trip a command so everything queued before it has been handled.
    async fn settle(&self) {
        let _ = timeout(WAIT, self.handle.refresh())
            .await
            .expect("coordinator stalled");
    }

    async fn go_offline(&self) {
        self.monitor.report(Connectivity::Offline);
        self.settle().await;
        assert_eq!(self.handle.state(), SyncState::OfflineCached);
    }

    async fn go_online(&mut self) -> ReconcileReport {
        self.monitor.report(Connectivity::Online);
        let report = self.next_reconciled().await;
        self.settle().await;
        assert_eq!(self.handle.state(), SyncState::OnlineLive);
        report
    }

    async fn next_reconciled(&mut self) -> ReconcileReport {
        timeout(WAIT, async {
            loop {
                match self.events.recv().await {
                    Ok(SyncEvent::Reconciled(report)) => return report,
                    Ok(_) => continue,
                    Err(err) => panic!("event channel failed: {err}"),
                }
            }
        })
        .await
        .expect("no reconciliation happened")
    }

    /// Events published so far, without waiting.
    fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    async fn cached_items(&self) -> Snapshot {
        LocalCacheStore::new(self.kv.clone())
            .load("cachedItems")
            .await
            .unwrap()
            .unwrap_or_default()
    }

    fn quantity(&self, id: &str) -> Option<u32> {
        self.handle
            .items()
            .into_iter()
            .find(|item| item.id == id)
            .map(|item| item.quantity)
    }

    fn restock_names(&self) -> Vec<String> {
        self.handle
            .restock()
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    async fn remote_restock_names(&self) -> Vec<String> {
        self.remote
            .peek(RESTOCK)
            .await
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }
}

// Reconciliation

#[tokio::test]
async fn reconnect_without_changes_writes_nothing() {
    let mut h = Harness::online(vec![milk(2), eggs(6)]).await;
    let before = h.handle.items();
    assert_eq!(before.len(), 2);

    h.go_offline().await;
    let report = h.go_online().await;

    assert!(report.pushed.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(h.remote.write_count(), 0);
    assert_eq!(h.handle.items(), before);
    assert_eq!(h.handle.items(), h.remote.peek(ITEMS).await);
}

#[tokio::test]
async fn offline_quantity_is_pushed_on_reconnect() {
    let mut h = Harness::online(vec![milk(5), eggs(6)]).await;
    h.go_offline().await;

    let applied = h.handle.set_quantity("milk", 2).await.unwrap();
    assert_eq!(
        applied,
        Applied::QuantityChanged {
            id: "milk".into(),
            quantity: 2
        }
    );
    assert_eq!(h.remote.write_count(), 0);

    let report = h.go_online().await;

    assert_eq!(report.pushed, vec!["milk".to_string()]);
    assert_eq!(h.remote.write_count(), 1);
    let remote = h.remote.peek(ITEMS).await;
    assert_eq!(remote.iter().find(|i| i.id == "milk").unwrap().quantity, 2);
    assert_eq!(remote.iter().find(|i| i.id == "eggs").unwrap().quantity, 6);
    assert_eq!(h.quantity("milk"), Some(2));
}

#[tokio::test]
async fn cached_quantity_overrides_remote_change() {
    let mut h = Harness::online(vec![milk(2)]).await;
    h.go_offline().await;

    // Someone else edits the item while this client is away.
    h.remote.update_quantity(ITEMS, "milk", 5).await.unwrap();

    let report = h.go_online().await;

    assert_eq!(report.pushed, vec!["milk".to_string()]);
    assert_eq!(h.remote.peek(ITEMS).await[0].quantity, 2);
    assert_eq!(h.cached_items().await.items, h.handle.items());
    assert_eq!(h.quantity("milk"), Some(2));
}

#[tokio::test]
async fn server_only_items_are_adopted_unchanged() {
    let mut h = Harness::online(vec![milk(2)]).await;
    h.go_offline().await;

    let bread = h
        .remote
        .create(ITEMS, NewItem::new("Bread", "Bakery", 1))
        .await
        .unwrap();

    let report = h.go_online().await;

    assert_eq!(report.adopted, vec![bread.clone()]);
    assert!(report.pushed.is_empty());
    let adopted = h
        .handle
        .items()
        .into_iter()
        .find(|item| item.id == bread)
        .unwrap();
    assert_eq!(adopted.name, "Bread");
    assert_eq!(adopted.quantity, 1);
    assert_eq!(adopted.category, "Bakery");
}

#[tokio::test]
async fn items_created_offline_are_reported_not_pushed() {
    let mut h = Harness::online(vec![milk(2)]).await;
    h.go_offline().await;

    let Applied::Inserted { id } = h
        .handle
        .add_or_merge_item("Tea", "Pantry", 4)
        .await
        .unwrap()
    else {
        panic!("expected an insert");
    };

    let report = h.go_online().await;

    assert_eq!(report.local_only, vec![id]);
    assert_eq!(h.remote.write_count(), 0);
    assert!(h.handle.items().iter().all(|item| item.name != "Tea"));
}

#[tokio::test]
async fn push_failure_does_not_block_going_live() {
    let mut h = Harness::online(vec![milk(5), eggs(6)]).await;
    h.go_offline().await;
    h.handle.set_quantity("milk", 1).await.unwrap();
    h.handle.set_quantity("eggs", 2).await.unwrap();
    h.remote.fail_writes_for("milk");
    h.drain_events();

    h.monitor.report(Connectivity::Online);
    h.settle().await;
    let events = h.drain_events();

    assert_eq!(h.handle.state(), SyncState::OnlineLive);
    assert!(events.iter().any(|event| matches!(
        event,
        SyncEvent::Error(SyncError::ReconciliationPushFailed { id, .. }) if id == "milk"
    )));
    let report = events
        .into_iter()
        .find_map(|event| match event {
            SyncEvent::Reconciled(report) => Some(report),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.failed, vec!["milk".to_string()]);
    assert_eq!(report.pushed, vec!["eggs".to_string()]);

    // The failed item keeps the server quantity.
    assert_eq!(h.quantity("milk"), Some(5));
    assert_eq!(h.quantity("eggs"), Some(2));
}

#[tokio::test]
async fn failed_fetch_stays_offline_until_a_retry_succeeds() {
    let mut h = Harness::online(vec![milk(2)]).await;
    h.go_offline().await;
    h.handle.set_quantity("milk", 7).await.unwrap();

    h.remote.fail_reads(true);
    h.monitor.report(Connectivity::Online);
    h.settle().await;

    assert_eq!(h.handle.state(), SyncState::OfflineCached);
    assert!(h
        .drain_events()
        .iter()
        .any(|event| matches!(event, SyncEvent::Error(SyncError::RemoteReadFailed(_)))));

    // Online but unsynced: edits are refused rather than kept local.
    assert!(matches!(
        h.handle.set_quantity("milk", 9).await,
        Err(SyncError::RemoteReadFailed(_))
    ));
    assert_eq!(h.quantity("milk"), Some(7));

    h.remote.fail_reads(false);
    let report = h.handle.resync().await.unwrap();

    assert_eq!(report.pushed, vec!["milk".to_string()]);
    assert_eq!(h.handle.state(), SyncState::OnlineLive);
    assert_eq!(h.remote.peek(ITEMS).await[0].quantity, 7);
}

#[tokio::test]
async fn failed_resync_keeps_the_live_subscriptions() {
    let h = Harness::online(vec![milk(2)]).await;

    h.remote.fail_reads(true);
    assert!(matches!(
        h.handle.resync().await,
        Err(SyncError::RemoteReadFailed(_))
    ));
    assert_eq!(h.handle.state(), SyncState::OnlineLive);
    assert_eq!(h.remote.subscription_count(), 2);

    h.remote.fail_reads(false);
    let Applied::Inserted { id } = h.handle.add_or_merge_item("Tea", "Pantry", 1).await.unwrap()
    else {
        panic!("expected an insert");
    };

    assert_eq!(h.remote.write_count(), 1);
    assert!(h.remote.peek(ITEMS).await.iter().any(|item| item.id == id));
    h.settle().await;
    assert_eq!(h.quantity(&id), Some(1));
}

#[tokio::test]
async fn failed_connect_at_startup_is_retried_before_the_next_command() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.seed(ITEMS, [milk(2)]).await;
    remote.fail_reads(true);

    let h = Harness::start_on(
        remote,
        Config::default(),
        MemoryKeyValue::new(),
        Connectivity::Online,
    )
    .await;

    assert_eq!(h.handle.state(), SyncState::OfflineCached);
    assert!(matches!(
        h.handle.add_or_merge_item("Tea", "Pantry", 1).await,
        Err(SyncError::RemoteReadFailed(_))
    ));
    assert!(h.handle.items().is_empty());
    assert_eq!(h.remote.write_count(), 0);

    h.remote.fail_reads(false);
    let Applied::Inserted { id } = h.handle.add_or_merge_item("Tea", "Pantry", 1).await.unwrap()
    else {
        panic!("expected an insert");
    };

    assert_eq!(h.handle.state(), SyncState::OnlineLive);
    assert_eq!(h.remote.subscription_count(), 2);
    h.settle().await;
    assert_eq!(h.quantity("milk"), Some(2));
    assert_eq!(h.quantity(&id), Some(1));
}

#[tokio::test]
async fn rapid_edges_reconcile_once() {
    let mut h = Harness::online(vec![milk(2)]).await;
    h.go_offline().await;
    h.drain_events();

    h.monitor.report(Connectivity::Online);
    h.monitor.report(Connectivity::Offline);
    h.monitor.report(Connectivity::Online);
    h.settle().await;

    let reconciled = h
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, SyncEvent::Reconciled(_)))
        .count();
    assert_eq!(reconciled, 1);
    assert_eq!(h.handle.state(), SyncState::OnlineLive);
}

#[tokio::test]
async fn resync_requires_connectivity() {
    let h = Harness::online(vec![milk(2)]).await;
    h.go_offline().await;

    assert_eq!(h.handle.resync().await, Err(SyncError::Offline));
    assert_eq!(h.handle.refresh().await, Err(SyncError::Offline));
}

// Mutations

#[tokio::test]
async fn online_mutations_go_through_the_remote() {
    let h = Harness::online(vec![]).await;

    let Applied::Inserted { id } = h.handle.add_or_merge_item("Milk", "Dairy", 2).await.unwrap()
    else {
        panic!("expected an insert");
    };
    // Not applied optimistically; visible once the subscription delivers.
    h.settle().await;
    assert_eq!(h.quantity(&id), Some(2));

    let merged = h.handle.add_or_merge_item("MILK", "Dairy", 3).await.unwrap();
    assert_eq!(
        merged,
        Applied::QuantityChanged {
            id: id.clone(),
            quantity: 5
        }
    );
    h.settle().await;
    assert_eq!(h.quantity(&id), Some(5));
    assert_eq!(h.remote.peek(ITEMS).await.len(), 1);

    h.handle.delete_item(id.clone()).await.unwrap();
    h.settle().await;
    assert!(h.handle.items().is_empty());
}

#[tokio::test]
async fn adjust_clamps_at_zero() {
    let h = Harness::online(vec![milk(2)]).await;

    let applied = h.handle.adjust_quantity("milk", -5).await.unwrap();
    assert_eq!(
        applied,
        Applied::QuantityChanged {
            id: "milk".into(),
            quantity: 0
        }
    );
    h.settle().await;
    assert_eq!(h.remote.peek(ITEMS).await[0].quantity, 0);

    h.go_offline().await;
    h.handle.set_quantity("milk", 2).await.unwrap();
    h.handle.adjust_quantity("milk", -5).await.unwrap();
    assert_eq!(h.quantity("milk"), Some(0));
}

#[tokio::test]
async fn invalid_mutations_are_rejected() {
    let h = Harness::online(vec![milk(2)]).await;

    assert!(matches!(
        h.handle.add_or_merge_item("  ", "Dairy", 1).await,
        Err(SyncError::Engine(EngineError::InvalidItem(_)))
    ));
    assert!(matches!(
        h.handle.add_or_merge_item("Cheese", "", 1).await,
        Err(SyncError::Engine(EngineError::InvalidItem(_)))
    ));
    assert_eq!(
        h.handle.delete_item("ghost").await,
        Err(SyncError::Engine(EngineError::ItemNotFound("ghost".into())))
    );
    assert_eq!(h.remote.write_count(), 1);
}

#[tokio::test]
async fn offline_mutations_stay_local_and_are_cached() {
    let h = Harness::online(vec![milk(2)]).await;
    h.go_offline().await;

    let Applied::Inserted { id } = h.handle.add_or_merge_item("Bread", "Bakery", 3).await.unwrap()
    else {
        panic!("expected an insert");
    };
    let merged = h.handle.add_or_merge_item("bread", "Bakery", 2).await.unwrap();
    assert_eq!(
        merged,
        Applied::QuantityChanged {
            id: id.clone(),
            quantity: 5
        }
    );

    let cached = h.cached_items().await;
    assert_eq!(cached.get(&id).map(|item| item.quantity), Some(5));
    assert_eq!(h.handle.items_in_category("Bakery").len(), 1);
    assert_eq!(h.handle.items_in_category("").len(), 2);

    h.handle.delete_item(id.clone()).await.unwrap();
    assert!(h.cached_items().await.get(&id).is_none());
    assert_eq!(h.remote.write_count(), 0);
    assert_eq!(h.remote.peek(ITEMS).await, vec![milk(2)]);
}

// Restock list

#[tokio::test]
async fn depletion_adds_one_entry_and_restocking_removes_it() {
    let h = Harness::online(vec![eggs(1)]).await;
    assert!(h.handle.restock().is_empty());

    h.handle.set_quantity("eggs", 0).await.unwrap();
    h.settle().await;

    assert_eq!(h.restock_names(), vec!["Eggs"]);
    assert_eq!(h.remote_restock_names().await, vec!["Eggs"]);

    h.handle.set_quantity("eggs", 3).await.unwrap();
    h.settle().await;

    assert!(h.restock_names().is_empty());
    assert!(h.remote_restock_names().await.is_empty());
}

#[tokio::test]
async fn deriving_again_writes_nothing() {
    let h = Harness::online(vec![eggs(0), milk(4)]).await;
    h.settle().await;
    assert_eq!(h.remote_restock_names().await, vec!["Eggs"]);

    let writes = h.remote.write_count();
    h.handle.refresh().await.unwrap();
    h.handle.refresh().await.unwrap();

    assert_eq!(h.remote.write_count(), writes);
    assert_eq!(h.remote_restock_names().await, vec!["Eggs"]);
}

#[tokio::test]
async fn threshold_one_counts_a_single_unit_as_depleted() {
    let config = Config {
        depletion_threshold: DepletionThreshold(1),
        ..Config::default()
    };
    let h = Harness::start(
        config,
        vec![eggs(2)],
        MemoryKeyValue::new(),
        Connectivity::Online,
    )
    .await;

    h.handle.adjust_quantity("eggs", -1).await.unwrap();
    h.settle().await;

    assert_eq!(h.restock_names(), vec!["Eggs"]);
}

#[tokio::test]
async fn offline_depletion_updates_the_local_list() {
    let h = Harness::online(vec![eggs(1)]).await;
    h.go_offline().await;

    h.handle.set_quantity("eggs", 0).await.unwrap();
    assert_eq!(h.restock_names(), vec!["Eggs"]);

    let cached = LocalCacheStore::new(h.kv.clone())
        .load_restock("cachedShoppingList")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(h.remote.write_count(), 0);
}

#[tokio::test]
async fn duplicate_remote_entries_are_collapsed() {
    let remote_entries = [
        Item::new("r1", "Coffee", 1, "Pantry", 10),
        Item::new("r2", "coffee", 1, "Pantry", 11),
    ];
    let h = Harness::online(vec![]).await;
    h.remote.seed(RESTOCK, remote_entries).await;
    h.settle().await;

    assert_eq!(h.handle.restock().len(), 1);
}

#[tokio::test]
async fn manual_restock_entries_online() {
    let h = Harness::online(vec![]).await;

    assert!(h.handle.add_restock_entry("Coffee", "Pantry", 1).await.unwrap());
    assert!(!h.handle.add_restock_entry("coffee", "Pantry", 2).await.unwrap());
    assert!(matches!(
        h.handle.add_restock_entry("Tea", "Pantry", 0).await,
        Err(SyncError::Engine(EngineError::InvalidItem(_)))
    ));
    h.settle().await;
    assert_eq!(h.handle.search_restock("cof").len(), 1);

    assert_eq!(h.handle.remove_restock_entry("COFFEE").await.unwrap(), 1);
    h.settle().await;
    assert!(h.handle.restock().is_empty());
    assert!(h.remote_restock_names().await.is_empty());
}

#[tokio::test]
async fn manual_restock_entries_offline() {
    let h = Harness::online(vec![]).await;
    h.go_offline().await;

    assert!(h.handle.add_restock_entry("Coffee", "Pantry", 1).await.unwrap());
    assert_eq!(h.restock_names(), vec!["Coffee"]);
    assert_eq!(h.handle.remove_restock_entry("coffee").await.unwrap(), 1);
    assert!(h.handle.restock().is_empty());
    assert_eq!(h.remote.write_count(), 0);
}

// Startup and lifecycle

#[tokio::test]
async fn corrupt_cache_starts_empty() {
    let kv = MemoryKeyValue::new();
    kv.set("cachedItems", "{definitely not json".to_string())
        .await
        .unwrap();

    let h = Harness::start(Config::default(), vec![milk(2)], kv, Connectivity::Offline).await;

    assert_eq!(h.handle.state(), SyncState::OfflineCached);
    assert!(h.handle.items().is_empty());

    // Still usable.
    h.handle.add_or_merge_item("Milk", "Dairy", 1).await.unwrap();
    assert_eq!(h.handle.items().len(), 1);
}

#[tokio::test]
async fn offline_start_serves_the_cache() {
    let kv = MemoryKeyValue::new();
    LocalCacheStore::new(kv.clone())
        .save("cachedItems", &Snapshot::new(vec![milk(3)], 1))
        .await
        .unwrap();

    let h = Harness::start(Config::default(), vec![], kv, Connectivity::Offline).await;

    assert_eq!(h.handle.view().items.as_slice(), &[milk(3)]);
    assert_eq!(h.remote.subscription_count(), 0);
}

#[tokio::test]
async fn offline_start_derives_restock_from_the_cache() {
    let kv = MemoryKeyValue::new();
    LocalCacheStore::new(kv.clone())
        .save("cachedItems", &Snapshot::new(vec![eggs(0)], 1))
        .await
        .unwrap();

    let h = Harness::start(Config::default(), vec![], kv, Connectivity::Offline).await;

    assert_eq!(h.handle.items().len(), 1);
    assert_eq!(h.restock_names(), vec!["Eggs"]);
    let cached = LocalCacheStore::new(h.kv.clone())
        .load_restock("cachedShoppingList")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(h.remote.write_count(), 0);
}

#[tokio::test]
async fn going_offline_rederives_a_stale_restock_cache() {
    let h = Harness::online(vec![eggs(0)]).await;
    h.settle().await;
    assert_eq!(h.restock_names(), vec!["Eggs"]);

    // Lose the cached list; the offline set must rebuild it.
    LocalCacheStore::new(h.kv.clone())
        .save_restock("cachedShoppingList", &[])
        .await
        .unwrap();
    h.go_offline().await;

    assert_eq!(h.restock_names(), vec!["Eggs"]);
}

#[tokio::test]
async fn view_publishes_state_and_items_together() {
    let h = Harness::online(vec![milk(2)]).await;
    let mut watch = h.handle.watch();

    h.monitor.report(Connectivity::Offline);
    let view = timeout(
        WAIT,
        watch.wait_for(|view| view.state == SyncState::OfflineCached),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert_eq!(view.items.as_slice(), &[milk(2)]);
}

#[tokio::test]
async fn shutdown_releases_subscriptions() {
    let h = Harness::online(vec![milk(2)]).await;
    assert_eq!(h.remote.subscription_count(), 2);

    h.handle.shutdown().await.unwrap();

    assert_eq!(h.remote.subscription_count(), 0);
    assert_eq!(
        h.handle.set_quantity("milk", 1).await,
        Err(SyncError::Stopped)
    );
}
