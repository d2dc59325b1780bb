//! Bridgeport server
//!
//! Watches the configured `McpBridge` resource, reconciles its registries
//! into running watchers and serves their status over HTTP.

pub mod api;
pub mod controller;
pub mod model;
pub mod startup;
