//! Network reachability as seen by the sync layer.

use async_trait::async_trait;
use fieldsync_remote::RemoteSubmitter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Platform connectivity signal
#[async_trait]
pub trait ConnectivitySignal: Send + Sync {
    /// Whether the device currently believes it is online
    fn is_online(&self) -> bool;

    /// Resolve on the next offline -> online transition
    async fn online_restored(&self);
}

/// Connectivity state held in a `watch` channel and set by whoever observes the network
pub struct WatchConnectivity {
    tx: watch::Sender<bool>,
}

impl WatchConnectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    /// Record the latest observation; only changes wake waiters
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            log::info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }
}

#[async_trait]
impl ConnectivitySignal for WatchConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    async fn online_restored(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
            if *rx.borrow_and_update() {
                return;
            }
        }
    }
}

/// Poll the remote on a fixed interval and feed the answers into `connectivity`
pub fn spawn_reachability_probe(
    connectivity: Arc<WatchConnectivity>,
    remote: Arc<dyn RemoteSubmitter>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            match remote.probe().await {
                Ok(()) => connectivity.set_online(true),
                Err(e) => {
                    log::debug!("Reachability probe failed: {e}");
                    connectivity.set_online(false);
                }
            }
        }
    })
}
