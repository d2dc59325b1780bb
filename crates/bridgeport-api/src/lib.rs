//! Bridgeport API models
//!
//! This crate defines the types shared by the registry watchers, the
//! reconciler and the server:
//! - `bridge` - the `McpBridge` custom resource and its registry declarations
//! - `service` - service entries and the wrapper stored in the service cache
//! - `config` - generic discovered resources such as MCP server declarations

pub mod bridge;
pub mod config;
pub mod service;

pub use bridge::{
    McpBridge, McpBridgeSpec, RegistryConfig, RegistryKey, VirtualPort, VirtualPortService,
    is_valid_port,
};
pub use config::{Config, ConfigSpec, GroupVersionKind, McpServer, PathMatchRule};
pub use service::{Location, Port, Resolution, ServiceEntry, ServiceWrapper, WorkloadEntry};
