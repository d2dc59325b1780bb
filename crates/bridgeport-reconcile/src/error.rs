//! Reconciliation error types

use std::time::Duration;

use bridgeport_registry::RegistryError;

/// Errors returned by a reconciliation pass or by building one watcher
#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("reconcile registries failed, {failed} watcher(s) failed to initialize")]
    WatcherInit { failed: usize },

    #[error("reconcile registries failed, {pending} watcher(s) not ready after {timeout:?}")]
    ReadyTimeout { pending: usize, timeout: Duration },

    #[error("get auth secret {name} in namespace {namespace} error: {source}")]
    Credential {
        name: String,
        namespace: String,
        source: SecretError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised by a secret store lookup
#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    #[error("secret {0} not found")]
    NotFound(String),

    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
}
