//! Static and DNS registries
//!
//! These registries need no discovery protocol: the declared address is the
//! service. A static registry lists endpoints as `ip:port[,ip:port...]` and is
//! published as `<name>.static`; a DNS registry lists domains resolved on the
//! declared port and is published as `<name>.dns`. Reachability of the first
//! endpoint is probed periodically for the health flag.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bridgeport_api::{
    Config, ConfigSpec, GroupVersionKind, Port, Resolution, ServiceEntry, WorkloadEntry,
    is_valid_port,
};
use tracing::{debug, info};

use crate::cache::ServiceCache;
use crate::error::RegistryError;
use crate::factory::DirectOptions;
use crate::model::{RegistryType, WatcherStatus};
use crate::probe::probe_watcher_status;
use crate::watcher::{BaseWatcher, ReadyHandler, ServiceUpdateHandler, Watcher};

const DEFAULT_PROTOCOL: &str = "HTTP";

/// Watcher for `static` and `dns` registries
pub struct DirectWatcher {
    base: BaseWatcher,
    host: String,
    entry: ServiceEntry,
    destination_rule: Option<Config>,
    probe_target: (String, u32),
    options: DirectOptions,
}

impl DirectWatcher {
    /// Validate the declared addresses and prepare the service entry
    pub fn new(
        options: DirectOptions,
        cache: Arc<dyn ServiceCache>,
    ) -> Result<Self, RegistryError> {
        let common = &options.common;
        let protocol = if options.protocol.is_empty() {
            DEFAULT_PROTOCOL.to_string()
        } else {
            options.protocol.to_ascii_uppercase()
        };

        let (suffix, entry, probe_target) = match common.registry_type {
            RegistryType::Static => {
                let (entry, target) = static_entry(&common.name, &common.domain, &protocol)?;
                ("static", entry, target)
            }
            RegistryType::Dns => {
                let (entry, target) =
                    dns_entry(&common.name, &common.domain, common.port, &protocol)?;
                ("dns", entry, target)
            }
            other => {
                return Err(RegistryError::invalid_option(
                    &common.name,
                    format!("{} is not a direct registry type", other),
                ));
            }
        };

        let host = format!("{}.{}", common.name, suffix);
        let destination_rule = destination_rule(&host, &protocol, &options.sni);
        let base = BaseWatcher::new(common.registry_type.as_str(), &common.name, cache);

        Ok(Self {
            base,
            host,
            entry,
            destination_rule,
            probe_target,
            options,
        })
    }

    /// Host the service is published under
    pub fn host(&self) -> &str {
        &self.host
    }

    fn publish(&self) {
        let suffix = self.options.common.registry_type.as_str();
        self.base.publish_service(&self.host, self.entry.clone(), suffix);
        if let Some(rule) = &self.destination_rule {
            self.base.publish_config(rule.clone());
        }
        self.base.notify_service_update();
    }

    async fn probe(&self) {
        let (host, port) = &self.probe_target;
        let status = probe_watcher_status(host, *port).await;
        self.base.set_healthy(status == WatcherStatus::Healthy);
    }
}

fn static_entry(
    name: &str,
    domain: &str,
    protocol: &str,
) -> Result<(ServiceEntry, (String, u32)), RegistryError> {
    let mut endpoints = Vec::new();
    let mut first: Option<SocketAddr> = None;
    for address in domain.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let addr: SocketAddr = address.parse().map_err(|_| {
            RegistryError::invalid_option(name, format!("invalid static address: {}", address))
        })?;
        if addr.port() == 0 {
            return Err(RegistryError::invalid_option(
                name,
                format!("invalid static address port: {}", address),
            ));
        }
        first.get_or_insert(addr);
        endpoints.push(WorkloadEntry {
            address: addr.ip().to_string(),
            ports: HashMap::from([(protocol.to_ascii_lowercase(), addr.port() as u32)]),
            ..Default::default()
        });
    }

    let first = first
        .ok_or_else(|| RegistryError::invalid_option(name, "static registry has no address"))?;
    let entry = ServiceEntry {
        hosts: vec![format!("{}.static", name)],
        ports: vec![Port::new(first.port() as u32, protocol)],
        resolution: Resolution::Static,
        ..Default::default()
    }
    .with_endpoints(endpoints);

    Ok((entry, (first.ip().to_string(), first.port() as u32)))
}

fn dns_entry(
    name: &str,
    domain: &str,
    port: u32,
    protocol: &str,
) -> Result<(ServiceEntry, (String, u32)), RegistryError> {
    if !is_valid_port(port) {
        return Err(RegistryError::invalid_option(
            name,
            format!("invalid dns port: {}", port),
        ));
    }
    let domains: Vec<&str> = domain
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();
    let Some(first) = domains.first() else {
        return Err(RegistryError::invalid_option(name, "dns registry has no domain"));
    };

    let mut entry = ServiceEntry::dns(&format!("{}.dns", name), port, protocol);
    entry.endpoints = domains
        .iter()
        .map(|d| WorkloadEntry {
            address: d.to_string(),
            ..Default::default()
        })
        .collect();
    entry.resolution = Resolution::Dns;

    Ok((entry, (first.to_string(), port)))
}

fn destination_rule(host: &str, protocol: &str, sni: &str) -> Option<Config> {
    if sni.is_empty() && protocol != "HTTPS" {
        return None;
    }
    let mut tls = serde_json::json!({ "mode": "SIMPLE" });
    if !sni.is_empty() {
        tls["sni"] = serde_json::Value::String(sni.to_string());
    }
    Some(Config {
        group_version_kind: GroupVersionKind::new(
            "networking.istio.io",
            "v1alpha3",
            "DestinationRule",
        ),
        name: host.to_string(),
        namespace: String::new(),
        spec: ConfigSpec::Other(serde_json::json!({
            "host": host,
            "trafficPolicy": { "tls": tls },
        })),
    })
}

#[async_trait]
impl Watcher for DirectWatcher {
    async fn run(&self) {
        if self.base.is_stopped() {
            return;
        }

        self.publish();
        info!(
            registry_type = %self.base.registry_type(),
            registry_name = %self.base.registry_name(),
            host = %self.host,
            "Direct registry published"
        );
        self.base.signal_ready(true);

        let mut interval = tokio::time::interval(self.options.health_check_interval);
        loop {
            tokio::select! {
                _ = self.base.stopped() => break,
                _ = interval.tick() => self.probe().await,
            }
        }
        debug!(host = %self.host, "Direct registry watcher exited");
    }

    fn stop(&self) {
        self.base.stop();
    }

    fn is_healthy(&self) -> bool {
        self.base.is_healthy()
    }

    fn is_ready(&self) -> bool {
        self.base.is_ready()
    }

    fn registry_type(&self) -> &str {
        self.base.registry_type()
    }

    fn append_service_update_handler(&self, handler: ServiceUpdateHandler) {
        self.base.append_service_update_handler(handler);
    }

    fn ready_handler(&self, handler: ReadyHandler) {
        self.base.set_ready_handler(handler);
    }
}
