//! Registry credentials from Kubernetes secrets
//!
//! A registry declaring `authSecretName` gets its credentials from that secret
//! in the gateway namespace. The lookup happens every time the registry's
//! watcher is built, so rotated credentials take effect on the next update.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bridgeport_api::RegistryConfig;
use bridgeport_registry::auth::{
    AUTH_CONSUL_TOKEN_KEY, AUTH_ETCD_PASSWORD_KEY, AUTH_ETCD_USERNAME_KEY, AUTH_NACOS_PASSWORD_KEY,
    AUTH_NACOS_USERNAME_KEY, AuthOption,
};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::debug;

use crate::error::{ReconcileError, SecretError};

/// Read access to secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the data of secret `namespace/name`
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, SecretError>;
}

/// Secret store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, SecretError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .await?
            .ok_or_else(|| SecretError::NotFound(format!("{}/{}", namespace, name)))?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect())
    }
}

/// Resolves the [`AuthOption`] of a registry declaration
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
    namespace: String,
}

impl CredentialResolver {
    /// `namespace` is where auth secrets are looked up
    pub fn new(store: Arc<dyn SecretStore>, namespace: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registries without `authSecretName` get empty credentials. Keys
    /// missing from the secret leave their field empty.
    pub async fn resolve(&self, registry: &RegistryConfig) -> Result<AuthOption, ReconcileError> {
        let name = &registry.auth_secret_name;
        if name.is_empty() {
            return Ok(AuthOption::default());
        }

        let data = self
            .store
            .get(&self.namespace, name)
            .await
            .map_err(|source| ReconcileError::Credential {
                name: name.clone(),
                namespace: self.namespace.clone(),
                source,
            })?;

        let field = |key: &str| {
            data.get(key)
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .unwrap_or_default()
        };
        let auth = AuthOption {
            nacos_username: field(AUTH_NACOS_USERNAME_KEY),
            nacos_password: field(AUTH_NACOS_PASSWORD_KEY),
            consul_token: field(AUTH_CONSUL_TOKEN_KEY),
            etcd_username: field(AUTH_ETCD_USERNAME_KEY),
            etcd_password: field(AUTH_ETCD_PASSWORD_KEY),
        };
        debug!(
            registry = %registry.key(),
            secret = %name,
            auth = ?auth,
            "Resolved registry credentials"
        );
        Ok(auth)
    }
}
