//! Pantry shell - interactive driver for the inventory client.
//!
//! Runs the coordinator against an in-process remote store and the SQLite
//! cache, and reads commands from stdin. `online` / `offline` stand in for
//! the host's connectivity signal.

use pantry_client::{
    Config, Connectivity, ConnectivityMonitor, Coordinator, CoordinatorHandle, LocalCacheStore,
    MemoryRemoteStore, SqliteKeyValue, SyncEvent,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  online | offline                 report connectivity
  add <name> <category> <qty>      add or merge an item
  set <item> <qty>                 set a quantity
  adjust <item> <delta>            change a quantity
  delete <item>                    delete an item
  list [category]                  show items
  restock [query]                  show the restock list
  need <name> <category> <qty>     add a restock entry
  got <name>                       remove a restock entry
  refresh | resync | state | help | quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(cache = %config.cache_database_url, "Opening local cache");
    let cache = LocalCacheStore::new(SqliteKeyValue::connect(&config.cache_database_url).await?);

    let monitor = ConnectivityMonitor::new(Connectivity::from_online(config.start_online));
    let remote = Arc::new(MemoryRemoteStore::new());
    let handle = Coordinator::start(config, remote, cache, monitor.clone()).await;

    let mut events = handle.events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Connectivity(transition)) => {
                    tracing::info!(to = ?transition.to, "Connectivity event")
                }
                Ok(SyncEvent::Reconciled(report)) => tracing::info!(?report, "Reconciled"),
                Ok(SyncEvent::Error(err)) => tracing::warn!(error = %err, "Sync error"),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            words => {
                if let Err(err) = execute(&handle, &monitor, words).await {
                    println!("error: {err}");
                }
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

async fn execute(
    handle: &CoordinatorHandle,
    monitor: &ConnectivityMonitor,
    words: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    match words {
        ["online"] => {
            monitor.report(Connectivity::Online);
        }
        ["offline"] => {
            monitor.report(Connectivity::Offline);
        }
        ["add", name, category, quantity] => {
            let applied = handle
                .add_or_merge_item(*name, *category, quantity.parse()?)
                .await?;
            println!("{applied:?}");
        }
        ["set", item, quantity] => {
            let id = resolve(handle, item)?;
            println!("{:?}", handle.set_quantity(id, quantity.parse()?).await?);
        }
        ["adjust", item, delta] => {
            let id = resolve(handle, item)?;
            println!("{:?}", handle.adjust_quantity(id, delta.parse()?).await?);
        }
        ["delete", item] => {
            let id = resolve(handle, item)?;
            println!("{:?}", handle.delete_item(id).await?);
        }
        ["list"] | ["list", _] => {
            let category = words.get(1).copied().unwrap_or("");
            for item in handle.items_in_category(category) {
                println!(
                    "{:<38} {:<20} {:>5}  {}",
                    item.id, item.name, item.quantity, item.category
                );
            }
        }
        ["restock"] | ["restock", _] => {
            let query = words.get(1).copied().unwrap_or("");
            for entry in handle.search_restock(query) {
                println!("{:<20} {:>5}  {}", entry.name, entry.quantity, entry.category);
            }
        }
        ["need", name, category, quantity] => {
            let added = handle
                .add_restock_entry(*name, *category, quantity.parse()?)
                .await?;
            if !added {
                println!("{name} is already on the list");
            }
        }
        ["got", name] => {
            println!("removed {}", handle.remove_restock_entry(*name).await?);
        }
        ["refresh"] => handle.refresh().await?,
        ["resync"] => println!("{:?}", handle.resync().await?),
        ["state"] => println!("{:?}", handle.state()),
        _ => println!("{HELP}"),
    }
    Ok(())
}

/// Accept either an item id or a name.
fn resolve(handle: &CoordinatorHandle, item: &str) -> Result<String, Box<dyn std::error::Error>> {
    handle
        .items()
        .into_iter()
        .find(|candidate| candidate.id == item || candidate.has_name(item))
        .map(|found| found.id)
        .ok_or_else(|| format!("no item named {item}").into())
}
