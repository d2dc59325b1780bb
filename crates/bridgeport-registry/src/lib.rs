//! Bridgeport registry support
//!
//! This crate provides everything a registry backend needs to feed the
//! gateway's service cache:
//! - `watcher` - the `Watcher` contract and the shared `BaseWatcher` state
//! - `cache` - the service cache boundary and an in-memory implementation
//! - `factory` - per-backend options and watcher construction by registry type
//! - `direct` - the static/DNS backend
//! - `probe` - TCP reachability probe for backends without a health signal
//! - `vport` - virtual port lookup

pub mod auth;
pub mod cache;
pub mod direct;
pub mod error;
pub mod factory;
pub mod model;
pub mod probe;
pub mod vport;
pub mod watcher;

pub use auth::AuthOption;
pub use cache::{MemoryCache, ServiceCache};
pub use error::RegistryError;
pub use factory::{BackendOptions, DefaultWatcherFactory, WatcherContext, WatcherFactory};
pub use model::{RegistryType, WatcherStatus};
pub use probe::{DEFAULT_DIAL_TIMEOUT, probe_watcher_status};
pub use vport::get_service_vport;
pub use watcher::{BaseWatcher, ReadyHandler, ServiceUpdateHandler, Watcher};
