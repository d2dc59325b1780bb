//! Registry watcher contract
//!
//! A watcher continuously discovers services from one external registry and
//! publishes them into the shared service cache. Backends implement
//! [`Watcher`] and embed a [`BaseWatcher`] for the state every backend shares:
//! the latched readiness flag, the health flag, registered handlers, the stop
//! signal and the hosts published so far.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bridgeport_api::{Config, GroupVersionKind, ServiceEntry, ServiceWrapper};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cache::ServiceCache;

/// Callback invoked whenever a watcher's view of services changes
pub type ServiceUpdateHandler = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving readiness reports
pub type ReadyHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Contract of a registry backend
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Discover services until stopped. Runs as its own task.
    async fn run(&self);

    /// Request shutdown. Idempotent and non-blocking.
    fn stop(&self);

    /// Whether the backend is currently reachable
    fn is_healthy(&self) -> bool;

    /// Whether the first full sync has completed. Never reverts to false.
    fn is_ready(&self) -> bool;

    fn registry_type(&self) -> &str;

    fn append_service_update_handler(&self, handler: ServiceUpdateHandler);

    fn ready_handler(&self, handler: ReadyHandler);
}

/// State shared by all backends
pub struct BaseWatcher {
    registry_type: String,
    registry_name: String,
    cache: Arc<dyn ServiceCache>,
    ready: AtomicBool,
    healthy: AtomicBool,
    update_handlers: RwLock<Vec<ServiceUpdateHandler>>,
    ready_handler: RwLock<Option<ReadyHandler>>,
    published_hosts: Mutex<HashSet<String>>,
    published_configs: Mutex<HashSet<(GroupVersionKind, String, String)>>,
    stop_tx: watch::Sender<bool>,
}

impl BaseWatcher {
    pub fn new(registry_type: &str, registry_name: &str, cache: Arc<dyn ServiceCache>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            registry_type: registry_type.to_string(),
            registry_name: registry_name.to_string(),
            cache,
            ready: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            update_handlers: RwLock::new(Vec::new()),
            ready_handler: RwLock::new(None),
            published_hosts: Mutex::new(HashSet::new()),
            published_configs: Mutex::new(HashSet::new()),
            stop_tx,
        }
    }

    pub fn registry_type(&self) -> &str {
        &self.registry_type
    }

    pub fn registry_name(&self) -> &str {
        &self.registry_name
    }

    pub fn cache(&self) -> &Arc<dyn ServiceCache> {
        &self.cache
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub fn set_healthy(&self, healthy: bool) {
        let previous = self.healthy.swap(healthy, Ordering::SeqCst);
        if previous != healthy {
            info!(
                registry_type = %self.registry_type,
                registry_name = %self.registry_name,
                healthy,
                "Registry health changed"
            );
        }
    }

    pub fn append_service_update_handler(&self, handler: ServiceUpdateHandler) {
        self.update_handlers.write().push(handler);
    }

    pub fn set_ready_handler(&self, handler: ReadyHandler) {
        *self.ready_handler.write() = Some(handler);
    }

    /// Report readiness. A `true` report latches the ready flag; the
    /// registered handler receives every report.
    pub fn signal_ready(&self, ready: bool) {
        if ready {
            self.ready.store(true, Ordering::SeqCst);
        }
        let handler = self.ready_handler.read().clone();
        if let Some(handler) = handler {
            handler(ready);
        }
    }

    pub fn notify_service_update(&self) {
        let handlers = self.update_handlers.read().clone();
        for handler in handlers {
            handler();
        }
    }

    /// Publish a service under `host`, stamped with this registry's identity.
    /// Ignored once the watcher has been stopped.
    pub fn publish_service(&self, host: &str, entry: ServiceEntry, suffix: &str) {
        let mut hosts = self.published_hosts.lock();
        if self.is_stopped() {
            debug!(host, "Ignoring publish from stopped watcher");
            return;
        }
        let wrapper = ServiceWrapper::new(host, entry, &self.registry_type, &self.registry_name)
            .with_suffix(suffix);
        self.cache.update_service_wrapper(host, wrapper);
        hosts.insert(host.to_string());
    }

    /// Remove a service this watcher published earlier
    pub fn retract_service(&self, host: &str) {
        let mut hosts = self.published_hosts.lock();
        if hosts.remove(host) {
            self.cache.delete_service_wrapper(host);
        }
    }

    pub fn publish_config(&self, config: Config) {
        let mut configs = self.published_configs.lock();
        if self.is_stopped() {
            return;
        }
        configs.insert((
            config.group_version_kind.clone(),
            config.namespace.clone(),
            config.name.clone(),
        ));
        self.cache.update_config(config);
    }

    pub fn published_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.published_hosts.lock().iter().cloned().collect();
        hosts.sort();
        hosts
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Resolves once `stop` has been called
    pub async fn stopped(&self) {
        let mut rx = self.stop_tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Signal the run loop to exit and retract everything this watcher
    /// published. Only the first call has an effect.
    pub fn stop(&self) {
        if self.stop_tx.send_replace(true) {
            return;
        }

        let hosts: Vec<String> = {
            let mut published = self.published_hosts.lock();
            let hosts: Vec<String> = published.drain().collect();
            for host in &hosts {
                self.cache.delete_service_wrapper(host);
            }
            hosts
        };
        let configs: Vec<_> = {
            let mut published = self.published_configs.lock();
            let configs: Vec<_> = published.drain().collect();
            for (gvk, namespace, name) in &configs {
                self.cache.delete_config(gvk, namespace, name);
            }
            configs
        };

        debug!(
            registry_type = %self.registry_type,
            registry_name = %self.registry_name,
            services = hosts.len(),
            configs = configs.len(),
            "Registry watcher stopped"
        );

        if !hosts.is_empty() || !configs.is_empty() {
            self.notify_service_update();
        }
    }
}
