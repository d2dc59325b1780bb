//! Registry types and watcher status

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::RegistryError;

/// Kind of external service registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryType {
    Nacos,
    Nacos2,
    Nacos3,
    Zookeeper,
    Consul,
    Eureka,
    Static,
    Dns,
}

impl RegistryType {
    pub const ALL: [RegistryType; 8] = [
        RegistryType::Nacos,
        RegistryType::Nacos2,
        RegistryType::Nacos3,
        RegistryType::Zookeeper,
        RegistryType::Consul,
        RegistryType::Eureka,
        RegistryType::Static,
        RegistryType::Dns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::Nacos => "nacos",
            RegistryType::Nacos2 => "nacos2",
            RegistryType::Nacos3 => "nacos3",
            RegistryType::Zookeeper => "zookeeper",
            RegistryType::Consul => "consul",
            RegistryType::Eureka => "eureka",
            RegistryType::Static => "static",
            RegistryType::Dns => "dns",
        }
    }
}

impl FromStr for RegistryType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegistryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RegistryError::UnsupportedType(s.to_string()))
    }
}

impl Display for RegistryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a reachability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherStatus {
    Healthy,
    Unhealthy,
}

impl Display for WatcherStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WatcherStatus::Healthy => write!(f, "healthy"),
            WatcherStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}
