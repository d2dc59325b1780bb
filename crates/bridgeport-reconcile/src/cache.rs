//! Virtual port normalization over the shared service cache
//!
//! [`RegistryConfigCache`] wraps the cache every watcher writes into. Before a
//! service update reaches the wrapped cache, the first port of its entry is
//! rewritten to the virtual port declared by the owning registry, if any.
//! Every other operation is forwarded unchanged.

use std::sync::Arc;

use bridgeport_api::{Config, GroupVersionKind, McpBridge, ServiceWrapper};
use bridgeport_registry::{ServiceCache, get_service_vport};
use tracing::info;

/// Supplies the desired state the registry declarations are read from
pub type BridgeProvider = Arc<dyn Fn() -> Option<Arc<McpBridge>> + Send + Sync>;

pub struct RegistryConfigCache {
    inner: Arc<dyn ServiceCache>,
    bridge_provider: BridgeProvider,
}

impl RegistryConfigCache {
    pub fn new(inner: Arc<dyn ServiceCache>, bridge_provider: BridgeProvider) -> Self {
        Self {
            inner,
            bridge_provider,
        }
    }

    fn normalize_service_entry_port(&self, host: &str, wrapper: &mut ServiceWrapper) {
        let Some(bridge) = (self.bridge_provider)() else {
            return;
        };
        let Some(registry) = bridge
            .spec
            .registries
            .iter()
            .find(|r| r.is_registry(&wrapper.registry_type, &wrapper.registry_name))
        else {
            return;
        };
        let Some(vport) = get_service_vport(host, registry.vport.as_ref()) else {
            return;
        };
        if let Some(port) = wrapper
            .service_entry
            .as_mut()
            .and_then(|entry| entry.ports.first_mut())
        {
            info!("the vport of {} is {}, will update", host, vport);
            port.number = vport;
        }
    }
}

impl ServiceCache for RegistryConfigCache {
    fn update_service_wrapper(&self, host: &str, mut wrapper: ServiceWrapper) {
        self.normalize_service_entry_port(host, &mut wrapper);
        self.inner.update_service_wrapper(host, wrapper);
    }

    fn delete_service_wrapper(&self, host: &str) {
        self.inner.delete_service_wrapper(host);
    }

    fn get_service_wrapper(&self, host: &str) -> Option<ServiceWrapper> {
        self.inner.get_service_wrapper(host)
    }

    fn get_all_service_wrappers(&self) -> Vec<(String, ServiceWrapper)> {
        self.inner.get_all_service_wrappers()
    }

    fn purge_stale_services(&self) -> usize {
        self.inner.purge_stale_services()
    }

    fn update_config(&self, config: Config) {
        self.inner.update_config(config);
    }

    fn delete_config(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) {
        self.inner.delete_config(gvk, namespace, name);
    }

    fn get_all_configs(&self, gvk: &GroupVersionKind) -> Vec<Config> {
        self.inner.get_all_configs(gvk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgeport_api::{
        McpBridgeSpec, RegistryConfig, ServiceEntry, VirtualPort, VirtualPortService,
    };
    use bridgeport_registry::MemoryCache;

    fn decorated(registries: Vec<RegistryConfig>) -> (Arc<MemoryCache>, RegistryConfigCache) {
        let bridge = Arc::new(McpBridge::new("default", McpBridgeSpec { registries }));
        let inner = Arc::new(MemoryCache::new());
        let cache = RegistryConfigCache::new(inner.clone(), Arc::new(move || Some(bridge.clone())));
        (inner, cache)
    }

    fn consul_with_vport() -> RegistryConfig {
        let mut registry = RegistryConfig::new("consul", "dc1", "consul.local", 8500);
        registry.vport = Some(VirtualPort {
            default: 8080,
            services: vec![VirtualPortService {
                name: "svc-a".to_string(),
                value: 9090,
            }],
        });
        registry
    }

    fn update(cache: &RegistryConfigCache, host: &str, registry_type: &str, name: &str) {
        let wrapper = ServiceWrapper::new(
            host,
            ServiceEntry::dns(host, 80, "HTTP"),
            registry_type,
            name,
        );
        cache.update_service_wrapper(host, wrapper);
    }

    fn port_of(inner: &MemoryCache, host: &str) -> u32 {
        let entry = inner.get_service_wrapper(host).unwrap().service_entry.unwrap();
        entry.ports[0].number
    }

    #[test]
    fn test_service_override_and_default() {
        let (inner, cache) = decorated(vec![consul_with_vport()]);
        update(&cache, "svc-a", "consul", "dc1");
        update(&cache, "svc-b", "consul", "dc1");

        assert_eq!(port_of(&inner, "svc-a"), 9090);
        assert_eq!(port_of(&inner, "svc-b"), 8080);
    }

    #[test]
    fn test_registry_without_vport_keeps_port() {
        let (inner, cache) = decorated(vec![
            consul_with_vport(),
            RegistryConfig::new("nacos", "n1", "nacos.local", 8848),
        ]);
        update(&cache, "svc-a", "nacos", "n1");
        assert_eq!(port_of(&inner, "svc-a"), 80);
    }

    #[test]
    fn test_other_registry_with_same_name_not_matched() {
        let (inner, cache) = decorated(vec![consul_with_vport()]);
        update(&cache, "svc-a", "eureka", "dc1");
        assert_eq!(port_of(&inner, "svc-a"), 80);
    }

    #[test]
    fn test_wrapper_without_entry_passes_through() {
        let (inner, cache) = decorated(vec![consul_with_vport()]);
        let mut wrapper = ServiceWrapper::new("svc-a", ServiceEntry::default(), "consul", "dc1");
        wrapper.service_entry = None;
        cache.update_service_wrapper("svc-a", wrapper);
        assert!(inner.get_service_wrapper("svc-a").unwrap().service_entry.is_none());

        let empty_ports = ServiceWrapper::new("svc-c", ServiceEntry::default(), "consul", "dc1");
        cache.update_service_wrapper("svc-c", empty_ports);
        assert!(
            inner
                .get_service_wrapper("svc-c")
                .unwrap()
                .service_entry
                .unwrap()
                .ports
                .is_empty()
        );
    }

    #[test]
    fn test_no_desired_state_passes_through() {
        let inner = Arc::new(MemoryCache::new());
        let cache = RegistryConfigCache::new(
            inner.clone(),
            Arc::new(|| -> Option<Arc<McpBridge>> { None }),
        );
        update(&cache, "svc-a", "consul", "dc1");
        assert_eq!(port_of(&inner, "svc-a"), 80);
    }

    #[test]
    fn test_other_operations_forwarded() {
        let (inner, cache) = decorated(vec![]);
        update(&cache, "svc-a", "consul", "dc1");
        cache.delete_service_wrapper("svc-a");
        assert_eq!(inner.stale_hosts().len(), 1);
        assert_eq!(cache.purge_stale_services(), 1);
        assert!(cache.get_all_service_wrappers().is_empty());
    }
}
