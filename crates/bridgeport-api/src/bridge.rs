//! McpBridge desired-state resource
//!
//! An `McpBridge` declares the external service registries the gateway should
//! discover services from. Each entry in `spec.registries` is identified by its
//! `(type, name)` pair, rendered as the path-like key `type/name`.

use std::fmt::{Display, Formatter};

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// McpBridge specification
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "networking.bridgeport.io",
    version = "v1",
    kind = "McpBridge",
    plural = "mcpbridges",
    namespaced,
    schema = "disabled",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct McpBridgeSpec {
    /// Registries to discover services from, in declaration order
    #[serde(default)]
    pub registries: Vec<RegistryConfig>,
}

/// Declaration of one external service registry.
///
/// Values are never mutated after they have been diffed by the reconciler: a
/// changed declaration arrives as a new value and is compared structurally
/// with the previous one, list fields included in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Registry type (nacos, nacos2, nacos3, zookeeper, consul, eureka, static, dns)
    #[serde(rename = "type")]
    pub registry_type: String,
    /// Registry name, unique within its type
    pub name: String,
    /// Registry address (host, domain or comma separated `ip:port` list)
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub sni: String,

    #[serde(default)]
    pub nacos_address_server: String,
    #[serde(default)]
    pub nacos_access_key: String,
    #[serde(default)]
    pub nacos_secret_key: String,
    #[serde(default)]
    pub nacos_namespace_id: String,
    #[serde(default)]
    pub nacos_namespace: String,
    #[serde(default)]
    pub nacos_groups: Vec<String>,
    /// Refresh interval in nanoseconds
    #[serde(default)]
    pub nacos_refresh_interval: i64,

    #[serde(default)]
    pub consul_namespace: String,
    #[serde(default)]
    pub consul_datacenter: String,
    #[serde(default)]
    pub consul_service_tag: String,
    /// Refresh interval in nanoseconds
    #[serde(default)]
    pub consul_refresh_interval: i64,

    #[serde(default)]
    pub zk_services_path: Vec<String>,

    /// Name of the secret holding the registry credentials
    #[serde(default)]
    pub auth_secret_name: String,

    #[serde(default)]
    pub mcp_server_export_domains: Vec<String>,
    #[serde(default)]
    pub mcp_server_base_url: String,
    #[serde(default, rename = "enableMCPServer")]
    pub enable_mcp_server: bool,

    /// Virtual port overrides applied to discovered services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vport: Option<VirtualPort>,
}

impl RegistryConfig {
    /// Create a declaration with only type, name and address set
    pub fn new(registry_type: &str, name: &str, domain: &str, port: u32) -> Self {
        Self {
            registry_type: registry_type.to_string(),
            name: name.to_string(),
            domain: domain.to_string(),
            port,
            ..Default::default()
        }
    }

    /// Identity key of this registry
    pub fn key(&self) -> RegistryKey {
        RegistryKey::new(&self.registry_type, &self.name)
    }

    /// Whether this declaration describes the registry `registry_type/name`
    pub fn is_registry(&self, registry_type: &str, name: &str) -> bool {
        self.registry_type == registry_type && self.name == name
    }
}

/// Virtual port overrides for one registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualPort {
    /// Port used when no per-service override matches
    #[serde(default)]
    pub default: u32,
    /// Per-service overrides
    #[serde(default)]
    pub services: Vec<VirtualPortService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualPortService {
    pub name: String,
    pub value: u32,
}

/// A port is valid when it lies in `(0, 65535]`
pub fn is_valid_port(port: u32) -> bool {
    port > 0 && port <= 65535
}

/// Identity of a registry declaration: `(type, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey {
    registry_type: String,
    name: String,
}

impl RegistryKey {
    pub fn new(registry_type: &str, name: &str) -> Self {
        Self {
            registry_type: registry_type.to_string(),
            name: name.to_string(),
        }
    }

    pub fn registry_type(&self) -> &str {
        &self.registry_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for RegistryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.registry_type, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_key_display() {
        let registry = RegistryConfig::new("nacos2", "prod", "nacos.example.com", 8848);
        assert_eq!(registry.key().to_string(), "nacos2/prod");
        assert_eq!(registry.key().name(), "prod");
        assert_eq!(registry.key().registry_type(), "nacos2");
    }

    #[test]
    fn test_is_valid_port() {
        assert!(!is_valid_port(0));
        assert!(is_valid_port(1));
        assert!(is_valid_port(65535));
        assert!(!is_valid_port(65536));
    }

    #[test]
    fn test_structural_equality_is_order_sensitive() {
        let mut a = RegistryConfig::new("nacos", "a", "127.0.0.1", 8848);
        a.nacos_groups = vec!["g1".to_string(), "g2".to_string()];
        let mut b = a.clone();
        assert_eq!(a, b);

        b.nacos_groups.reverse();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deserialize_bridge_spec() {
        let json = r#"{
            "registries": [
                {
                    "type": "consul",
                    "name": "dc1",
                    "domain": "consul.local",
                    "port": 8500,
                    "consulDatacenter": "dc1",
                    "authSecretName": "consul-auth",
                    "vport": {"default": 8080, "services": [{"name": "svc-a", "value": 9090}]}
                },
                {"type": "nacos3", "name": "mcp", "enableMCPServer": true}
            ]
        }"#;

        let spec: McpBridgeSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.registries.len(), 2);

        let consul = &spec.registries[0];
        assert_eq!(consul.registry_type, "consul");
        assert_eq!(consul.consul_datacenter, "dc1");
        assert_eq!(consul.auth_secret_name, "consul-auth");
        let vport = consul.vport.as_ref().unwrap();
        assert_eq!(vport.default, 8080);
        assert_eq!(vport.services[0].name, "svc-a");

        assert!(spec.registries[1].enable_mcp_server);
        assert!(spec.registries[1].vport.is_none());
    }

    #[test]
    fn test_bridge_resource_identity() {
        let bridge = McpBridge::new("default", McpBridgeSpec::default());
        assert_eq!(bridge.metadata.name.as_deref(), Some("default"));
        assert!(bridge.spec.registries.is_empty());
    }
}
