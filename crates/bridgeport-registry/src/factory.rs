//! Watcher construction by registry type
//!
//! [`BackendOptions::from_registry`] maps a declared registry onto the option
//! set of its backend. A [`WatcherFactory`] turns those options into a running
//! watcher. [`DefaultWatcherFactory`] builds the static/DNS backend itself and
//! hands every other registry type to a driver registered for it.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bridgeport_api::{RegistryConfig, VirtualPort};

use crate::auth::AuthOption;
use crate::cache::ServiceCache;
use crate::direct::DirectWatcher;
use crate::error::RegistryError;
use crate::model::RegistryType;
use crate::watcher::Watcher;

/// Refresh interval used when a registry declares none
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Nacos group used when a registry declares none
pub const DEFAULT_NACOS_GROUP: &str = "DEFAULT_GROUP";

/// Gateway-level settings passed to every backend
#[derive(Debug, Clone, Default)]
pub struct WatcherContext {
    /// Cluster id of the gateway
    pub cluster_id: String,
    /// Namespace the gateway runs in
    pub namespace: String,
}

/// Settings every backend receives
#[derive(Debug, Clone, PartialEq)]
pub struct CommonOptions {
    pub registry_type: RegistryType,
    pub name: String,
    pub domain: String,
    pub port: u32,
    pub vport: Option<VirtualPort>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NacosOptions {
    pub common: CommonOptions,
    pub namespace_id: String,
    pub namespace: String,
    pub groups: Vec<String>,
    pub refresh_interval: Duration,
    pub auth: AuthOption,
}

/// Options of the Nacos 2.x / 3.x gRPC backend
#[derive(Debug, Clone, PartialEq)]
pub struct NacosV2Options {
    pub common: CommonOptions,
    pub address_server: String,
    pub access_key: String,
    pub secret_key: String,
    pub namespace_id: String,
    pub namespace: String,
    pub groups: Vec<String>,
    pub refresh_interval: Duration,
    pub mcp_export_domains: Vec<String>,
    pub mcp_base_url: String,
    pub enable_mcp_server: bool,
    pub cluster_id: String,
    /// Namespace MCP server resources are published into
    pub gateway_namespace: String,
    pub auth: AuthOption,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZookeeperOptions {
    pub common: CommonOptions,
    pub services_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsulOptions {
    pub common: CommonOptions,
    pub namespace: String,
    pub datacenter: String,
    pub service_tag: String,
    pub refresh_interval: Duration,
    pub auth: AuthOption,
}

/// Options of the static/DNS backend
#[derive(Debug, Clone, PartialEq)]
pub struct DirectOptions {
    pub common: CommonOptions,
    pub protocol: String,
    pub sni: String,
    pub health_check_interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EurekaOptions {
    pub common: CommonOptions,
}

/// Backend-specific options, one variant per backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOptions {
    Nacos(NacosOptions),
    NacosV2(NacosV2Options),
    Zookeeper(ZookeeperOptions),
    Consul(ConsulOptions),
    Direct(DirectOptions),
    Eureka(EurekaOptions),
}

impl BackendOptions {
    /// Select the backend for `registry` and build its options.
    ///
    /// Fails with [`RegistryError::UnsupportedType`] for an unknown type.
    pub fn from_registry(
        registry: &RegistryConfig,
        auth: &AuthOption,
        ctx: &WatcherContext,
    ) -> Result<Self, RegistryError> {
        let registry_type = RegistryType::from_str(&registry.registry_type)?;
        let common = CommonOptions {
            registry_type,
            name: registry.name.clone(),
            domain: registry.domain.clone(),
            port: registry.port,
            vport: registry.vport.clone(),
        };

        let options = match registry_type {
            RegistryType::Nacos => BackendOptions::Nacos(NacosOptions {
                common,
                namespace_id: registry.nacos_namespace_id.clone(),
                namespace: registry.nacos_namespace.clone(),
                groups: nacos_groups(&registry.nacos_groups),
                refresh_interval: refresh_interval(registry.nacos_refresh_interval),
                auth: auth.clone(),
            }),
            RegistryType::Nacos2 | RegistryType::Nacos3 => {
                BackendOptions::NacosV2(NacosV2Options {
                    common,
                    address_server: registry.nacos_address_server.clone(),
                    access_key: registry.nacos_access_key.clone(),
                    secret_key: registry.nacos_secret_key.clone(),
                    namespace_id: registry.nacos_namespace_id.clone(),
                    namespace: registry.nacos_namespace.clone(),
                    groups: nacos_groups(&registry.nacos_groups),
                    refresh_interval: refresh_interval(registry.nacos_refresh_interval),
                    mcp_export_domains: registry.mcp_server_export_domains.clone(),
                    mcp_base_url: registry.mcp_server_base_url.clone(),
                    enable_mcp_server: registry.enable_mcp_server,
                    cluster_id: ctx.cluster_id.clone(),
                    gateway_namespace: ctx.namespace.clone(),
                    auth: auth.clone(),
                })
            }
            RegistryType::Zookeeper => BackendOptions::Zookeeper(ZookeeperOptions {
                common,
                services_path: registry.zk_services_path.clone(),
            }),
            RegistryType::Consul => BackendOptions::Consul(ConsulOptions {
                common,
                namespace: registry.consul_namespace.clone(),
                datacenter: registry.consul_datacenter.clone(),
                service_tag: registry.consul_service_tag.clone(),
                refresh_interval: refresh_interval(registry.consul_refresh_interval),
                auth: auth.clone(),
            }),
            RegistryType::Static | RegistryType::Dns => BackendOptions::Direct(DirectOptions {
                common,
                protocol: registry.protocol.clone(),
                sni: registry.sni.clone(),
                health_check_interval: DEFAULT_REFRESH_INTERVAL,
            }),
            RegistryType::Eureka => BackendOptions::Eureka(EurekaOptions { common }),
        };

        Ok(options)
    }

    pub fn common(&self) -> &CommonOptions {
        match self {
            BackendOptions::Nacos(o) => &o.common,
            BackendOptions::NacosV2(o) => &o.common,
            BackendOptions::Zookeeper(o) => &o.common,
            BackendOptions::Consul(o) => &o.common,
            BackendOptions::Direct(o) => &o.common,
            BackendOptions::Eureka(o) => &o.common,
        }
    }

    pub fn registry_type(&self) -> RegistryType {
        self.common().registry_type
    }
}

fn nacos_groups(groups: &[String]) -> Vec<String> {
    if groups.is_empty() {
        vec![DEFAULT_NACOS_GROUP.to_string()]
    } else {
        groups.to_vec()
    }
}

/// Declared intervals are nanoseconds; zero or negative means unset
fn refresh_interval(nanos: i64) -> Duration {
    if nanos <= 0 {
        DEFAULT_REFRESH_INTERVAL
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

/// Builds watchers from backend options
pub trait WatcherFactory: Send + Sync {
    fn create(
        &self,
        options: BackendOptions,
        cache: Arc<dyn ServiceCache>,
    ) -> Result<Arc<dyn Watcher>, RegistryError>;
}

/// Factory with the static/DNS backend built in and pluggable drivers for
/// the protocol backends.
#[derive(Default, Clone)]
pub struct DefaultWatcherFactory {
    drivers: HashMap<RegistryType, Arc<dyn WatcherFactory>>,
}

impl DefaultWatcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the driver handling `registry_type`. A driver registered for
    /// static or dns replaces the built-in backend.
    pub fn with_driver(
        mut self,
        registry_type: RegistryType,
        driver: Arc<dyn WatcherFactory>,
    ) -> Self {
        self.drivers.insert(registry_type, driver);
        self
    }

    /// Registry types this factory can build
    pub fn supported_types(&self) -> Vec<RegistryType> {
        RegistryType::ALL
            .into_iter()
            .filter(|t| {
                matches!(t, RegistryType::Static | RegistryType::Dns)
                    || self.drivers.contains_key(t)
            })
            .collect()
    }
}

impl WatcherFactory for DefaultWatcherFactory {
    fn create(
        &self,
        options: BackendOptions,
        cache: Arc<dyn ServiceCache>,
    ) -> Result<Arc<dyn Watcher>, RegistryError> {
        let registry_type = options.registry_type();
        if let Some(driver) = self.drivers.get(&registry_type) {
            return driver.create(options, cache);
        }

        match options {
            BackendOptions::Direct(direct) => Ok(Arc::new(DirectWatcher::new(direct, cache)?)),
            _ => Err(RegistryError::BackendUnavailable(registry_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn ctx() -> WatcherContext {
        WatcherContext {
            cluster_id: "cluster-1".to_string(),
            namespace: "gateway-system".to_string(),
        }
    }

    #[test]
    fn test_unsupported_type() {
        let registry = RegistryConfig::new("etcd", "e1", "127.0.0.1", 2379);
        let err = BackendOptions::from_registry(&registry, &AuthOption::default(), &ctx())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedType(t) if t == "etcd"));
    }

    #[test]
    fn test_nacos3_uses_v2_options() {
        let mut registry = RegistryConfig::new("nacos3", "mcp", "nacos.local", 8848);
        registry.enable_mcp_server = true;
        registry.mcp_server_base_url = "/mcp".to_string();
        registry.nacos_refresh_interval = 5_000_000_000;
        let auth = AuthOption {
            nacos_username: "nacos".to_string(),
            ..Default::default()
        };

        let options = BackendOptions::from_registry(&registry, &auth, &ctx()).unwrap();
        let BackendOptions::NacosV2(v2) = options else {
            panic!("expected nacos v2 options");
        };
        assert_eq!(v2.common.registry_type, RegistryType::Nacos3);
        assert!(v2.enable_mcp_server);
        assert_eq!(v2.mcp_base_url, "/mcp");
        assert_eq!(v2.cluster_id, "cluster-1");
        assert_eq!(v2.gateway_namespace, "gateway-system");
        assert_eq!(v2.groups, vec![DEFAULT_NACOS_GROUP]);
        assert_eq!(v2.refresh_interval, Duration::from_secs(5));
        assert_eq!(v2.auth.nacos_username, "nacos");
    }

    #[test]
    fn test_consul_options() {
        let mut registry = RegistryConfig::new("consul", "dc1", "consul.local", 8500);
        registry.consul_datacenter = "dc1".to_string();
        registry.consul_service_tag = "gateway".to_string();

        let options =
            BackendOptions::from_registry(&registry, &AuthOption::default(), &ctx()).unwrap();
        let BackendOptions::Consul(consul) = options else {
            panic!("expected consul options");
        };
        assert_eq!(consul.datacenter, "dc1");
        assert_eq!(consul.service_tag, "gateway");
        assert_eq!(consul.refresh_interval, DEFAULT_REFRESH_INTERVAL);
    }

    #[test]
    fn test_protocol_backend_without_driver() {
        let registry = RegistryConfig::new("eureka", "e1", "eureka.local", 8761);
        let options =
            BackendOptions::from_registry(&registry, &AuthOption::default(), &ctx()).unwrap();

        let factory = DefaultWatcherFactory::new();
        let err = factory
            .create(options, Arc::new(MemoryCache::new()))
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::BackendUnavailable(RegistryType::Eureka)));
    }

    #[test]
    fn test_builds_direct_watcher() {
        let registry = RegistryConfig::new("static", "s1", "10.0.0.1:80", 0);
        let options =
            BackendOptions::from_registry(&registry, &AuthOption::default(), &ctx()).unwrap();

        let factory = DefaultWatcherFactory::new();
        let watcher = factory.create(options, Arc::new(MemoryCache::new())).unwrap();
        assert_eq!(watcher.registry_type(), "static");
        assert_eq!(
            factory.supported_types(),
            vec![RegistryType::Static, RegistryType::Dns]
        );
    }
}
