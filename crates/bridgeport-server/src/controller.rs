//! McpBridge watch loop and reconciliation driver
//!
//! [`watch_bridges`] follows the configured `McpBridge` resource and forwards
//! every change as the new desired state. [`BridgeController`] owns the
//! reconciler on a single task: it reconciles on every change and re-runs the
//! last desired state periodically, which retries registries whose watchers
//! failed to build.

use std::sync::Arc;
use std::time::Duration;

use bridgeport_api::McpBridge;
use bridgeport_reconcile::Reconciler;
use futures::TryStreamExt;
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Desired state update; `None` when the bridge resource is absent
pub type BridgeUpdate = Option<Arc<McpBridge>>;

pub struct BridgeController {
    reconciler: Reconciler,
    desired: BridgeUpdate,
    resync_interval: Duration,
}

impl BridgeController {
    pub fn new(reconciler: Reconciler, resync_interval: Duration) -> Self {
        Self {
            reconciler,
            desired: None,
            resync_interval,
        }
    }

    /// Reconcile every received update until shutdown or until the update
    /// channel closes, then stop all watchers. A shutdown signal also cancels
    /// a pass still waiting for watcher readiness.
    pub async fn run(
        mut self,
        mut updates: mpsc::Receiver<BridgeUpdate>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Reconciler {
        let mut resync = tokio::time::interval(self.resync_interval);
        resync.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        resync.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                update = updates.recv() => match update {
                    Some(bridge) => self.desired = bridge,
                    None => break,
                },
                _ = resync.tick() => {}
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    warn!("Shutdown requested during reconcile pass");
                    break;
                }
                _ = self.reconcile() => {}
            }
        }

        info!("Stopping registry watchers");
        self.reconciler.shutdown();
        self.reconciler
    }

    async fn reconcile(&mut self) {
        match self.reconciler.reconcile(self.desired.clone()).await {
            Ok(summary) => debug!(?summary, "Reconcile pass finished"),
            Err(e) => warn!(error = %e, "Reconcile pass failed"),
        }
    }
}

/// Forward changes of `namespace/name` to `updates` until the receiver is
/// dropped.
pub async fn watch_bridges(
    client: Client,
    namespace: String,
    name: String,
    updates: mpsc::Sender<BridgeUpdate>,
) {
    let api: Api<McpBridge> = Api::namespaced(client, &namespace);
    let config = watcher::Config::default().fields(&format!("metadata.name={}", name));
    let stream = watcher::watcher(api, config).default_backoff();
    tokio::pin!(stream);

    info!(namespace = %namespace, name = %name, "Starting McpBridge watcher");

    let mut found = false;
    loop {
        let event = match stream.try_next().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "McpBridge watch error");
                continue;
            }
        };

        let update = match event {
            Event::Init => {
                found = false;
                debug!("McpBridge watcher initialized");
                continue;
            }
            Event::InitApply(bridge) | Event::Apply(bridge) => {
                found = true;
                Some(Some(Arc::new(bridge)))
            }
            Event::Delete(_) => {
                found = false;
                info!(namespace = %namespace, name = %name, "McpBridge deleted");
                Some(None)
            }
            Event::InitDone => {
                debug!(found, "McpBridge watcher initial sync complete");
                // a bridge deleted while disconnected never produces Delete
                (!found).then_some(None)
            }
        };

        if let Some(update) = update
            && updates.send(update).await.is_err()
        {
            break;
        }
    }

    info!("McpBridge watcher stopped");
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bridgeport_api::{McpBridgeSpec, RegistryConfig, RegistryKey, ServiceEntry};
    use bridgeport_reconcile::{ReconcilerConfig, SecretError, SecretStore};
    use bridgeport_registry::{
        BackendOptions, BaseWatcher, DefaultWatcherFactory, MemoryCache, ReadyHandler,
        RegistryError, RegistryType, ServiceCache, ServiceUpdateHandler, Watcher, WatcherFactory,
    };

    use super::*;

    struct NoSecrets;

    #[async_trait::async_trait]
    impl SecretStore for NoSecrets {
        async fn get(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<BTreeMap<String, Vec<u8>>, SecretError> {
            Err(SecretError::NotFound(format!("{}/{}", namespace, name)))
        }
    }

    /// Publishes one service and never reports readiness
    struct PendingWatcher {
        base: BaseWatcher,
    }

    #[async_trait::async_trait]
    impl Watcher for PendingWatcher {
        async fn run(&self) {
            let host = format!("{}.nacos", self.base.registry_name());
            self.base.publish_service(&host, ServiceEntry::dns(&host, 8848, "HTTP"), "nacos");
            self.base.stopped().await;
        }

        fn stop(&self) {
            self.base.stop();
        }

        fn is_healthy(&self) -> bool {
            self.base.is_healthy()
        }

        fn is_ready(&self) -> bool {
            self.base.is_ready()
        }

        fn registry_type(&self) -> &str {
            self.base.registry_type()
        }

        fn append_service_update_handler(&self, handler: ServiceUpdateHandler) {
            self.base.append_service_update_handler(handler);
        }

        fn ready_handler(&self, handler: ReadyHandler) {
            self.base.set_ready_handler(handler);
        }
    }

    struct PendingDriver;

    impl WatcherFactory for PendingDriver {
        fn create(
            &self,
            options: BackendOptions,
            cache: Arc<dyn ServiceCache>,
        ) -> Result<Arc<dyn Watcher>, RegistryError> {
            let common = options.common();
            Ok(Arc::new(PendingWatcher {
                base: BaseWatcher::new(common.registry_type.as_str(), &common.name, cache),
            }))
        }
    }

    #[tokio::test]
    async fn test_reconciles_updates_and_stops_on_shutdown() {
        let cache = Arc::new(MemoryCache::new());
        let reconciler = Reconciler::new(
            cache.clone(),
            Arc::new(DefaultWatcherFactory::new()),
            Arc::new(NoSecrets),
            Arc::new(|| {}),
            ReconcilerConfig {
                ready_timeout: Duration::from_secs(5),
                ..Default::default()
            },
        );
        let status = reconciler.status_view();
        let controller = BridgeController::new(reconciler, Duration::from_secs(3600));

        let (tx, rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(controller.run(rx, shutdown_rx));

        let bridge = McpBridge::new(
            "default",
            McpBridgeSpec {
                registries: vec![RegistryConfig::new("static", "backend", "127.0.0.1:1", 0)],
            },
        );
        tx.send(Some(Arc::new(bridge))).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while status.watcher_count() == 0 || !status.is_ready() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("watcher never became ready");
        assert!(cache.get_service_wrapper("backend.static").is_some());

        shutdown_tx.send(()).unwrap();
        let reconciler = handle.await.unwrap();

        assert_eq!(status.watcher_count(), 0);
        assert!(
            reconciler
                .watcher(&RegistryKey::new("static", "backend"))
                .is_none()
        );
        assert_eq!(cache.stale_hosts().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_pending_reconcile() {
        let cache = Arc::new(MemoryCache::new());
        let factory =
            DefaultWatcherFactory::new().with_driver(RegistryType::Nacos, Arc::new(PendingDriver));
        let reconciler = Reconciler::new(
            cache.clone(),
            Arc::new(factory),
            Arc::new(NoSecrets),
            Arc::new(|| {}),
            ReconcilerConfig {
                ready_timeout: Duration::from_secs(3600),
                ..Default::default()
            },
        );
        let status = reconciler.status_view();
        let controller = BridgeController::new(reconciler, Duration::from_secs(3600));

        let (tx, rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(controller.run(rx, shutdown_rx));

        let bridge = McpBridge::new(
            "default",
            McpBridgeSpec {
                registries: vec![RegistryConfig::new("nacos", "n", "127.0.0.1", 8848)],
            },
        );
        tx.send(Some(Arc::new(bridge))).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while cache.get_service_wrapper("n.nacos").is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("watcher never published");
        assert!(!status.is_ready());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("controller waited for the readiness timeout")
            .unwrap();

        assert_eq!(status.watcher_count(), 0);
        assert_eq!(cache.stale_hosts().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_channel_stops_controller() {
        let reconciler = Reconciler::new(
            Arc::new(MemoryCache::new()),
            Arc::new(DefaultWatcherFactory::new()),
            Arc::new(NoSecrets),
            Arc::new(|| {}),
            ReconcilerConfig::default(),
        );
        let controller = BridgeController::new(reconciler, Duration::from_secs(3600));

        let (tx, rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        drop(tx);

        let reconciler = tokio::time::timeout(
            Duration::from_secs(1),
            controller.run(rx, shutdown_rx),
        )
        .await
        .expect("controller did not stop");
        assert!(reconciler.registry_keys().is_empty());
    }
}
