//! Watcher status and MCP server projections

use std::collections::HashMap;
use std::sync::Arc;

use bridgeport_api::{ConfigSpec, GroupVersionKind, McpServer, RegistryKey};
use bridgeport_registry::{ServiceCache, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Active watchers by registry key. Written only by the reconciler.
pub(crate) type WatcherMap = Arc<RwLock<HashMap<RegistryKey, Arc<dyn Watcher>>>>;

/// Status of one active registry watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryWatcherStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub registry_type: String,
    pub healthy: bool,
    pub ready: bool,
}

/// Read-only view of the reconciler's watchers and the service cache.
///
/// Cheap to clone; handed to the HTTP layer while the reconciler keeps
/// running on its own task.
#[derive(Clone)]
pub struct RegistryStatusView {
    watchers: WatcherMap,
    cache: Arc<dyn ServiceCache>,
}

impl RegistryStatusView {
    pub(crate) fn new(watchers: WatcherMap, cache: Arc<dyn ServiceCache>) -> Self {
        Self { watchers, cache }
    }

    /// Status of every active watcher, sorted by registry key
    pub fn registry_watcher_status_list(&self) -> Vec<RegistryWatcherStatus> {
        let watchers = self.watchers.read();
        let mut keys: Vec<&RegistryKey> = watchers.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let watcher = &watchers[key];
                RegistryWatcherStatus {
                    name: key.name().to_string(),
                    registry_type: key.registry_type().to_string(),
                    healthy: watcher.is_healthy(),
                    ready: watcher.is_ready(),
                }
            })
            .collect()
    }

    /// MCP servers discovered by any watcher
    pub fn mcp_servers(&self) -> Vec<McpServer> {
        self.cache
            .get_all_configs(&GroupVersionKind::mcp_server())
            .into_iter()
            .filter_map(|config| match config.spec {
                ConfigSpec::McpServer(server) => Some(server),
                ConfigSpec::Other(_) => None,
            })
            .collect()
    }

    /// Whether every active watcher has completed its first sync
    pub fn is_ready(&self) -> bool {
        self.watchers.read().values().all(|w| w.is_ready())
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }
}
