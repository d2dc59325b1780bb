//! Bridgeport registry reconciliation
//!
//! The [`Reconciler`] converges the set of running registry watchers to the
//! registries declared by an `McpBridge`:
//! - `reconciler` - diff, watcher lifecycle, readiness wait and stale purge
//! - `barrier` - readiness barrier released once per started watcher
//! - `cache` - service cache decorator applying virtual port overrides
//! - `credential` - registry credentials from Kubernetes secrets
//! - `status` - watcher status and MCP server projections

pub mod barrier;
pub mod cache;
pub mod credential;
pub mod error;
pub mod reconciler;
pub mod status;

pub use barrier::{ReadinessBarrier, ReadyLatch};
pub use cache::{BridgeProvider, RegistryConfigCache};
pub use credential::{CredentialResolver, KubeSecretStore, SecretStore};
pub use error::{ReconcileError, SecretError};
pub use reconciler::{
    DEFAULT_READY_TIMEOUT, ReconcileSummary, Reconciler, ReconcilerConfig, RegistryDiff,
    diff_registries,
};
pub use status::{RegistryStatusView, RegistryWatcherStatus};
