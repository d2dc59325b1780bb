//! Registry watcher reconciliation
//!
//! A [`Reconciler`] owns one watcher per declared registry. Each call to
//! [`Reconciler::reconcile`] diffs the registries of the new desired state
//! against the active ones by `(type, name)` key and then:
//!
//! 1. stops and forgets watchers of registries no longer declared
//! 2. replaces the watchers of registries whose declaration changed
//! 3. builds and starts watchers for new registries
//! 4. waits until every watcher started in this pass has reported readiness,
//!    bounded by the ready timeout
//! 5. purges services the cache holds for watchers that went away
//!
//! A registry whose watcher cannot be built is logged and skipped; the other
//! registries are still reconciled and the pass reports the number of
//! failures at the end. Failed registries never enter the active set, so the
//! next pass retries them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use bridgeport_api::{McpBridge, McpServer, RegistryConfig, RegistryKey};
use bridgeport_registry::{
    BackendOptions, RegistryType, ServiceCache, ServiceUpdateHandler, Watcher, WatcherContext,
    WatcherFactory,
};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::barrier::ReadinessBarrier;
use crate::cache::RegistryConfigCache;
use crate::credential::{CredentialResolver, SecretStore};
use crate::error::ReconcileError;
use crate::status::{RegistryStatusView, RegistryWatcherStatus, WatcherMap};

/// How long a pass waits for newly started watchers to become ready
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub ready_timeout: Duration,
    /// Namespace the gateway runs in; auth secrets are read from it
    pub namespace: String,
    pub cluster_id: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            namespace: String::new(),
            cluster_id: String::new(),
        }
    }
}

/// Outcome counts of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Watchers still not ready when the pass stopped waiting
    pub pending: usize,
    pub purged: usize,
}

/// Partition of desired registries against active ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryDiff {
    pub created: BTreeMap<RegistryKey, RegistryConfig>,
    pub updated: BTreeMap<RegistryKey, RegistryConfig>,
    pub deleted: BTreeSet<RegistryKey>,
}

impl RegistryDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Diff `desired` against `active`. Registries declared twice under one key
/// keep the last declaration; identical declarations are left out.
pub fn diff_registries(
    active: &HashMap<RegistryKey, RegistryConfig>,
    desired: &[RegistryConfig],
) -> RegistryDiff {
    let desired: BTreeMap<RegistryKey, &RegistryConfig> =
        desired.iter().map(|r| (r.key(), r)).collect();

    let mut diff = RegistryDiff::default();
    for (key, registry) in &desired {
        match active.get(key) {
            None => {
                diff.created.insert(key.clone(), (*registry).clone());
            }
            Some(current) if current == *registry => {}
            Some(_) => {
                diff.updated.insert(key.clone(), (*registry).clone());
            }
        }
    }
    diff.deleted = active
        .keys()
        .filter(|key| !desired.contains_key(*key))
        .cloned()
        .collect();
    diff
}

pub struct Reconciler {
    registries: HashMap<RegistryKey, RegistryConfig>,
    watchers: WatcherMap,
    bridge: Arc<RwLock<Option<Arc<McpBridge>>>>,
    cache: Arc<dyn ServiceCache>,
    factory: Arc<dyn WatcherFactory>,
    credentials: CredentialResolver,
    context: WatcherContext,
    service_update: ServiceUpdateHandler,
    ready_timeout: Duration,
    last_summary: Option<ReconcileSummary>,
}

impl Reconciler {
    /// `cache` is the shared service cache; watchers write into it through
    /// the virtual port decorator. `service_update` is appended to every
    /// watcher built by this reconciler.
    pub fn new(
        cache: Arc<dyn ServiceCache>,
        factory: Arc<dyn WatcherFactory>,
        secrets: Arc<dyn SecretStore>,
        service_update: ServiceUpdateHandler,
        config: ReconcilerConfig,
    ) -> Self {
        let bridge: Arc<RwLock<Option<Arc<McpBridge>>>> = Arc::new(RwLock::new(None));
        let provider = bridge.clone();
        let cache = Arc::new(RegistryConfigCache::new(
            cache,
            Arc::new(move || provider.read().clone()),
        ));

        Self {
            registries: HashMap::new(),
            watchers: Arc::new(RwLock::new(HashMap::new())),
            bridge,
            cache,
            factory,
            credentials: CredentialResolver::new(secrets, &config.namespace),
            context: WatcherContext {
                cluster_id: config.cluster_id,
                namespace: config.namespace,
            },
            service_update,
            ready_timeout: config.ready_timeout,
            last_summary: None,
        }
    }

    /// Converge the active watchers to the registries of `bridge`. `None`
    /// means no registry is desired.
    pub async fn reconcile(
        &mut self,
        bridge: Option<Arc<McpBridge>>,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let desired = bridge
            .as_ref()
            .map(|b| b.spec.registries.clone())
            .unwrap_or_default();
        // Published before any watcher starts so their first updates already
        // see the new virtual ports.
        *self.bridge.write() = bridge;

        let diff = diff_registries(&self.registries, &desired);
        info!(
            to_be_created = diff.created.len(),
            to_be_updated = diff.updated.len(),
            to_be_deleted = diff.deleted.len(),
            "Reconciling registries"
        );

        let mut summary = ReconcileSummary {
            created: diff.created.len(),
            updated: diff.updated.len(),
            deleted: diff.deleted.len(),
            ..Default::default()
        };

        for key in &diff.deleted {
            self.remove_watcher(key);
        }

        let barrier = ReadinessBarrier::new();
        for (key, registry) in diff.updated {
            self.remove_watcher(&key);
            if !self.start_watcher(key, registry, &barrier).await {
                summary.failed += 1;
            }
        }
        for (key, registry) in diff.created {
            if !self.start_watcher(key, registry, &barrier).await {
                summary.failed += 1;
            }
        }

        if let Err(pending) = barrier.wait(self.ready_timeout).await {
            warn!(
                pending,
                timeout = ?self.ready_timeout,
                "Timed out waiting for registry watchers to become ready"
            );
            summary.pending = pending;
        }

        summary.purged = self.cache.purge_stale_services();
        self.last_summary = Some(summary.clone());

        if summary.failed > 0 {
            return Err(ReconcileError::WatcherInit {
                failed: summary.failed,
            });
        }
        if summary.pending > 0 {
            return Err(ReconcileError::ReadyTimeout {
                pending: summary.pending,
                timeout: self.ready_timeout,
            });
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            purged = summary.purged,
            "Registries reconciled"
        );
        Ok(summary)
    }

    /// Stop every watcher and forget all registries
    pub fn shutdown(&mut self) {
        let watchers: Vec<(RegistryKey, Arc<dyn Watcher>)> =
            self.watchers.write().drain().collect();
        for (key, watcher) in watchers {
            watcher.stop();
            info!(
                registry_type = %key.registry_type(),
                registry_name = %key.name(),
                "Registry watcher stopped"
            );
        }
        self.registries.clear();
        *self.bridge.write() = None;
    }

    /// Cache decorator the watchers write into
    pub fn cache(&self) -> Arc<dyn ServiceCache> {
        self.cache.clone()
    }

    pub fn status_view(&self) -> RegistryStatusView {
        RegistryStatusView::new(self.watchers.clone(), self.cache.clone())
    }

    pub fn registry_watcher_status_list(&self) -> Vec<RegistryWatcherStatus> {
        self.status_view().registry_watcher_status_list()
    }

    pub fn mcp_servers(&self) -> Vec<McpServer> {
        self.status_view().mcp_servers()
    }

    pub fn last_summary(&self) -> Option<&ReconcileSummary> {
        self.last_summary.as_ref()
    }

    pub fn watcher(&self, key: &RegistryKey) -> Option<Arc<dyn Watcher>> {
        self.watchers.read().get(key).cloned()
    }

    pub fn registry(&self, key: &RegistryKey) -> Option<&RegistryConfig> {
        self.registries.get(key)
    }

    /// Keys of the active registries, sorted
    pub fn registry_keys(&self) -> Vec<RegistryKey> {
        let mut keys: Vec<RegistryKey> = self.registries.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn remove_watcher(&mut self, key: &RegistryKey) {
        self.registries.remove(key);
        let watcher = self.watchers.write().remove(key);
        if let Some(watcher) = watcher {
            watcher.stop();
            info!(
                registry_type = %key.registry_type(),
                registry_name = %key.name(),
                "Registry watcher stopped"
            );
        }
    }

    /// Build and spawn the watcher of `registry`. Returns `false` if the
    /// watcher could not be built.
    async fn start_watcher(
        &mut self,
        key: RegistryKey,
        registry: RegistryConfig,
        barrier: &ReadinessBarrier,
    ) -> bool {
        let watcher = match self.build_watcher(&registry, barrier).await {
            Ok(watcher) => watcher,
            Err(e) => {
                error!(
                    registry_type = %key.registry_type(),
                    registry_name = %key.name(),
                    error = %e,
                    "Failed to initialize registry watcher"
                );
                return false;
            }
        };

        let task = watcher.clone();
        tokio::spawn(async move {
            task.run().await;
        });
        info!(
            registry_type = %key.registry_type(),
            registry_name = %key.name(),
            "Registry watcher started"
        );

        self.watchers.write().insert(key.clone(), watcher);
        self.registries.insert(key, registry);
        true
    }

    async fn build_watcher(
        &self,
        registry: &RegistryConfig,
        barrier: &ReadinessBarrier,
    ) -> Result<Arc<dyn Watcher>, ReconcileError> {
        // Unknown types fail before the secret store is consulted.
        registry.registry_type.parse::<RegistryType>()?;

        let auth = self.credentials.resolve(registry).await?;
        let options = BackendOptions::from_registry(registry, &auth, &self.context)?;
        let watcher = self.factory.create(options, self.cache.clone())?;

        let latch = barrier.register();
        let registry_type = registry.registry_type.clone();
        let registry_name = registry.name.clone();
        watcher.ready_handler(Arc::new(move |ready| {
            if latch.release() && ready {
                info!(
                    registry_type = %registry_type,
                    registry_name = %registry_name,
                    "Registry watcher is ready"
                );
            }
        }));
        watcher.append_service_update_handler(self.service_update.clone());

        Ok(watcher)
    }
}
