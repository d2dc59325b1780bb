//! Service cache boundary
//!
//! Every watcher writes the services it discovers into a shared
//! `ServiceCache`; the routing layer reads from it. Implementations must be
//! safe for concurrent writers.
//!
//! `MemoryCache` defers deletion: a deleted entry is moved aside and stays
//! visible until `purge_stale_services` runs, unless a watcher publishes the
//! same host again first. The reconciler purges once the watchers it started
//! have reported readiness, so a registry being replaced does not make its
//! services flap out of the routing view.

use std::collections::HashSet;

use bridgeport_api::{Config, GroupVersionKind, ServiceWrapper};
use dashmap::DashMap;
use tracing::debug;

/// Shared store of discovered services and resources
pub trait ServiceCache: Send + Sync {
    /// Insert or replace the service published under `host`
    fn update_service_wrapper(&self, host: &str, wrapper: ServiceWrapper);

    /// Mark the service published under `host` as deleted
    fn delete_service_wrapper(&self, host: &str);

    fn get_service_wrapper(&self, host: &str) -> Option<ServiceWrapper>;

    /// All services currently visible, sorted by host
    fn get_all_service_wrappers(&self) -> Vec<(String, ServiceWrapper)>;

    /// Drop every deleted service that was not published again since.
    /// Returns the number of entries removed.
    fn purge_stale_services(&self) -> usize;

    fn update_config(&self, config: Config);

    fn delete_config(&self, gvk: &GroupVersionKind, namespace: &str, name: &str);

    /// All resources of one kind, sorted by namespace and name
    fn get_all_configs(&self, gvk: &GroupVersionKind) -> Vec<Config>;
}

type ConfigKey = (GroupVersionKind, String, String);

/// In-memory service cache
#[derive(Default)]
pub struct MemoryCache {
    services: DashMap<String, ServiceWrapper>,
    stale: DashMap<String, ServiceWrapper>,
    configs: DashMap<ConfigKey, Config>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts deleted but not yet purged
    pub fn stale_hosts(&self) -> HashSet<String> {
        self.stale.iter().map(|e| e.key().clone()).collect()
    }
}

impl ServiceCache for MemoryCache {
    fn update_service_wrapper(&self, host: &str, wrapper: ServiceWrapper) {
        self.stale.remove(host);
        self.services.insert(host.to_string(), wrapper);
    }

    fn delete_service_wrapper(&self, host: &str) {
        if let Some((host, wrapper)) = self.services.remove(host) {
            debug!(host = %host, "Service marked stale");
            self.stale.insert(host, wrapper);
        }
    }

    fn get_service_wrapper(&self, host: &str) -> Option<ServiceWrapper> {
        self.services
            .get(host)
            .or_else(|| self.stale.get(host))
            .map(|e| e.value().clone())
    }

    fn get_all_service_wrappers(&self) -> Vec<(String, ServiceWrapper)> {
        let mut all: Vec<(String, ServiceWrapper)> = self
            .services
            .iter()
            .chain(self.stale.iter())
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    fn purge_stale_services(&self) -> usize {
        let hosts: Vec<String> = self.stale.iter().map(|e| e.key().clone()).collect();
        let mut purged = 0;
        for host in hosts {
            if self.stale.remove(&host).is_some() {
                debug!(host = %host, "Stale service purged");
                purged += 1;
            }
        }
        purged
    }

    fn update_config(&self, config: Config) {
        let key = (
            config.group_version_kind.clone(),
            config.namespace.clone(),
            config.name.clone(),
        );
        self.configs.insert(key, config);
    }

    fn delete_config(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) {
        self.configs
            .remove(&(gvk.clone(), namespace.to_string(), name.to_string()));
    }

    fn get_all_configs(&self, gvk: &GroupVersionKind) -> Vec<Config> {
        let mut configs: Vec<Config> = self
            .configs
            .iter()
            .filter(|e| &e.key().0 == gvk)
            .map(|e| e.value().clone())
            .collect();
        configs.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        configs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgeport_api::{ConfigSpec, McpServer, ServiceEntry};

    fn wrapper(name: &str) -> ServiceWrapper {
        ServiceWrapper::new(name, ServiceEntry::dns(name, 80, "HTTP"), "static", "test")
    }

    #[test]
    fn test_deleted_service_visible_until_purge() {
        let cache = MemoryCache::new();
        cache.update_service_wrapper("a.static", wrapper("a"));
        cache.delete_service_wrapper("a.static");

        assert!(cache.get_service_wrapper("a.static").is_some());
        assert_eq!(cache.stale_hosts().len(), 1);

        assert_eq!(cache.purge_stale_services(), 1);
        assert!(cache.get_service_wrapper("a.static").is_none());
        assert!(cache.get_all_service_wrappers().is_empty());
    }

    #[test]
    fn test_republished_service_survives_purge() {
        let cache = MemoryCache::new();
        cache.update_service_wrapper("a.static", wrapper("a"));
        cache.update_service_wrapper("b.static", wrapper("b"));
        cache.delete_service_wrapper("a.static");
        cache.delete_service_wrapper("b.static");
        cache.update_service_wrapper("a.static", wrapper("a"));

        assert_eq!(cache.purge_stale_services(), 1);
        let hosts: Vec<String> = cache
            .get_all_service_wrappers()
            .into_iter()
            .map(|(h, _)| h)
            .collect();
        assert_eq!(hosts, vec!["a.static"]);
    }

    #[test]
    fn test_purge_without_deletes_is_noop() {
        let cache = MemoryCache::new();
        cache.update_service_wrapper("a.static", wrapper("a"));
        assert_eq!(cache.purge_stale_services(), 0);
        assert!(cache.get_service_wrapper("a.static").is_some());
    }

    #[test]
    fn test_configs_filtered_by_kind() {
        let cache = MemoryCache::new();
        cache.update_config(Config::mcp_server(
            "ns",
            McpServer {
                name: "b".to_string(),
                ..Default::default()
            },
        ));
        cache.update_config(Config::mcp_server(
            "ns",
            McpServer {
                name: "a".to_string(),
                ..Default::default()
            },
        ));
        let other = GroupVersionKind::new("networking.istio.io", "v1alpha3", "DestinationRule");
        cache.update_config(Config {
            group_version_kind: other.clone(),
            name: "dr".to_string(),
            namespace: "ns".to_string(),
            spec: ConfigSpec::Other(serde_json::json!({})),
        });

        let servers = cache.get_all_configs(&GroupVersionKind::mcp_server());
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "a");

        cache.delete_config(&other, "ns", "dr");
        assert!(cache.get_all_configs(&other).is_empty());
    }
}
