//! Service entry models
//!
//! A `ServiceEntry` is the routing-layer view of one discovered service. The
//! service cache stores it inside a `ServiceWrapper` that also records which
//! registry produced it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discovered service as exposed to the routing layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    /// Hosts associated with the service
    pub hosts: Vec<String>,
    /// Addresses (virtual IPs) for the service
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    /// Ports exposed by the service
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub resolution: Resolution,
    /// Endpoints for the service (when resolution is STATIC)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<WorkloadEntry>,
}

impl ServiceEntry {
    /// Service resolved through DNS on a single port
    pub fn dns(host: &str, port: u32, protocol: &str) -> Self {
        Self {
            hosts: vec![host.to_string()],
            ports: vec![Port::new(port, protocol)],
            resolution: Resolution::Dns,
            ..Default::default()
        }
    }

    /// Replace the endpoints and switch to static resolution
    pub fn with_endpoints(mut self, endpoints: Vec<WorkloadEntry>) -> Self {
        self.endpoints = endpoints;
        self.resolution = Resolution::Static;
        self
    }
}

/// Service port definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub number: u32,
    pub name: String,
    /// Protocol (HTTP, HTTPS, GRPC, TCP, ...)
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u32>,
}

impl Port {
    /// Port named after its protocol, e.g. `http` for `HTTP`
    pub fn new(number: u32, protocol: &str) -> Self {
        let protocol = protocol.to_ascii_uppercase();
        Self {
            number,
            name: protocol.to_ascii_lowercase(),
            protocol,
            target_port: None,
        }
    }
}

/// Service discovery resolution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    None,
    #[default]
    Static,
    Dns,
    DnsRoundRobin,
}

/// Service location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    MeshInternal,
    #[default]
    MeshExternal,
}

/// Endpoint of a service entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadEntry {
    pub address: String,
    /// Port mappings (port name -> number)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub ports: HashMap<String, u32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

/// Cached service together with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWrapper {
    pub service_name: String,
    pub service_entry: Option<ServiceEntry>,
    #[serde(default)]
    pub suffix: String,
    /// Type of the registry that produced this service
    pub registry_type: String,
    /// Name of the registry that produced this service
    pub registry_name: String,
    pub create_time: DateTime<Utc>,
}

impl ServiceWrapper {
    pub fn new(
        service_name: &str,
        service_entry: ServiceEntry,
        registry_type: &str,
        registry_name: &str,
    ) -> Self {
        Self {
            service_name: service_name.to_string(),
            service_entry: Some(service_entry),
            suffix: String::new(),
            registry_type: registry_type.to_string(),
            registry_name: registry_name.to_string(),
            create_time: Utc::now(),
        }
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_naming() {
        let port = Port::new(80, "http");
        assert_eq!(port.name, "http");
        assert_eq!(port.protocol, "HTTP");
    }

    #[test]
    fn test_service_entry_with_endpoints() {
        let endpoint = WorkloadEntry {
            address: "192.168.1.1".to_string(),
            ports: HashMap::from([("http".to_string(), 8080)]),
            ..Default::default()
        };

        let se = ServiceEntry::dns("svc.example.com", 80, "HTTP").with_endpoints(vec![endpoint]);

        assert_eq!(se.resolution, Resolution::Static);
        assert_eq!(se.endpoints.len(), 1);
        assert_eq!(se.ports[0].number, 80);
    }

    #[test]
    fn test_service_wrapper_serialization() {
        let wrapper = ServiceWrapper::new(
            "svc-a",
            ServiceEntry::dns("svc-a", 80, "http"),
            "consul",
            "dc1",
        )
        .with_suffix("consul");

        let json = serde_json::to_value(&wrapper).unwrap();
        assert_eq!(json["registryType"], "consul");
        assert_eq!(json["registryName"], "dc1");
        assert_eq!(json["serviceEntry"]["resolution"], "DNS");
    }
}
