//! Registry error types

use crate::model::RegistryType;

/// Errors raised while building or running a registry watcher
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("unsupported registry type: {0}")]
    UnsupportedType(String),

    #[error("no backend driver registered for registry type: {0}")]
    BackendUnavailable(RegistryType),

    #[error("invalid option for registry {registry}: {message}")]
    InvalidOption { registry: String, message: String },
}

impl RegistryError {
    pub fn invalid_option(registry: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::InvalidOption {
            registry: registry.into(),
            message: message.into(),
        }
    }
}
