//! Connectivity monitor.
//!
//! The host feeds its platform connectivity signal into [`ConnectivityMonitor::report`].
//! The monitor keeps the current status and emits a [`Transition`] only when
//! the status actually changes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Capacity of the transition channel. Receivers that fall further behind
/// re-read the current status instead.
const TRANSITION_CAPACITY: usize = 64;

/// Network status as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

/// An edge between two connectivity states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: Connectivity,
    pub to: Connectivity,
}

/// Tracks online/offline status and notifies listeners on each edge.
///
/// Cheap to clone; clones share the same status.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    status: Arc<watch::Sender<Connectivity>>,
    transitions: broadcast::Sender<Transition>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the status the host observed at startup.
    pub fn new(initial: Connectivity) -> Self {
        let (status, _) = watch::channel(initial);
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            status: Arc::new(status),
            transitions,
        }
    }

    /// Current status.
    pub fn status(&self) -> Connectivity {
        *self.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    /// Record the host's current status.
    ///
    /// Returns `true` if this was an edge. Reporting an unchanged status is a
    /// no-op.
    pub fn report(&self, to: Connectivity) -> bool {
        let mut from = to;
        let changed = self.status.send_if_modified(|current| {
            if *current == to {
                return false;
            }
            from = *current;
            *current = to;
            true
        });

        if changed {
            tracing::info!(?from, ?to, "Connectivity changed");
            // No receivers is fine; the status is still recorded.
            let _ = self.transitions.send(Transition { from, to });
        }
        changed
    }

    /// Subscribe to edges that happen after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    /// Invoke `handler` once per edge until the monitor is dropped.
    pub fn on_transition<F>(&self, handler: F) -> JoinHandle<()>
    where
        F: Fn(Transition) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(transition) => handler(transition),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Transition listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
