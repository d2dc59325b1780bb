//! TCP reachability probe
//!
//! Used by backends that have no native health signal.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::model::WatcherStatus;

/// Connect timeout of [`probe_watcher_status`]
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Join host and port, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u32) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Probe `host:port` with a TCP connect
pub async fn probe_watcher_status(host: &str, port: u32) -> WatcherStatus {
    let address = join_host_port(host, port);
    match timeout(DEFAULT_DIAL_TIMEOUT, TcpStream::connect(&address)).await {
        Ok(Ok(_stream)) => WatcherStatus::Healthy,
        Ok(Err(e)) => {
            debug!("TCP probe failed for {}: {}", address, e);
            WatcherStatus::Unhealthy
        }
        Err(_) => {
            debug!("TCP probe timeout for {}", address);
            WatcherStatus::Unhealthy
        }
    }
}
