//! Configuration management for the Bridgeport server
//!
//! Values come from `conf/application.yml` (optional), then environment
//! variables such as `BRIDGEPORT__HTTP__PORT`, then command line flags.

use std::time::Duration;

use anyhow::Context;
use bridgeport_reconcile::{DEFAULT_READY_TIMEOUT, ReconcilerConfig};
use clap::Parser;
use config::{Config, Environment, File};

use crate::startup::LoggingConfig;

pub const NAMESPACE_PROPERTY: &str = "bridgeport.namespace";
pub const CLUSTER_ID_PROPERTY: &str = "bridgeport.cluster_id";
pub const BRIDGE_NAME_PROPERTY: &str = "bridgeport.bridge_name";
pub const READY_TIMEOUT_PROPERTY: &str = "bridgeport.ready_timeout_secs";
pub const RESYNC_INTERVAL_PROPERTY: &str = "bridgeport.resync_interval_secs";
pub const HTTP_ADDRESS_PROPERTY: &str = "bridgeport.http.address";
pub const HTTP_PORT_PROPERTY: &str = "bridgeport.http.port";
pub const LOGS_PATH_PROPERTY: &str = "bridgeport.logs.path";
pub const LOGS_LEVEL_PROPERTY: &str = "bridgeport.logs.level";
pub const LOGS_CONSOLE_PROPERTY: &str = "bridgeport.logs.console";
pub const LOGS_FILE_PROPERTY: &str = "bridgeport.logs.file";

pub const DEFAULT_NAMESPACE: &str = "bridgeport-system";
pub const DEFAULT_CLUSTER_ID: &str = "Kubernetes";
pub const DEFAULT_BRIDGE_NAME: &str = "default";
pub const DEFAULT_HTTP_PORT: u16 = 8888;
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 30;

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "bridgeport-server", version, about)]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = "conf/application.yml")]
    pub config_file: String,
    /// Namespace the gateway runs in
    #[arg(short = 'n', long = "namespace", env = "POD_NAMESPACE")]
    pub namespace: Option<String>,
    #[arg(long = "cluster-id")]
    pub cluster_id: Option<String>,
    /// Name of the McpBridge resource to reconcile
    #[arg(long = "bridge-name")]
    pub bridge_name: Option<String>,
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(args: Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("bridgeport")
                    .prefix_separator("__")
                    .separator("__")
                    .keep_prefix(true)
                    .try_parsing(true),
            );

        if let Some(v) = args.namespace {
            builder = builder.set_override(NAMESPACE_PROPERTY, v)?;
        }
        if let Some(v) = args.cluster_id {
            builder = builder.set_override(CLUSTER_ID_PROPERTY, v)?;
        }
        if let Some(v) = args.bridge_name {
            builder = builder.set_override(BRIDGE_NAME_PROPERTY, v)?;
        }
        if let Some(v) = args.port {
            builder = builder.set_override(HTTP_PORT_PROPERTY, v as i64)?;
        }

        let config = builder
            .build()
            .with_context(|| format!("Failed to build configuration from {}", args.config_file))?;
        Ok(Configuration { config })
    }

    pub fn namespace(&self) -> String {
        self.config
            .get_string(NAMESPACE_PROPERTY)
            .unwrap_or(DEFAULT_NAMESPACE.to_string())
    }

    pub fn cluster_id(&self) -> String {
        self.config
            .get_string(CLUSTER_ID_PROPERTY)
            .unwrap_or(DEFAULT_CLUSTER_ID.to_string())
    }

    pub fn bridge_name(&self) -> String {
        self.config
            .get_string(BRIDGE_NAME_PROPERTY)
            .unwrap_or(DEFAULT_BRIDGE_NAME.to_string())
    }

    pub fn ready_timeout(&self) -> Duration {
        self.config
            .get_int(READY_TIMEOUT_PROPERTY)
            .ok()
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(DEFAULT_READY_TIMEOUT)
    }

    /// Interval of the periodic re-run of the last desired state
    pub fn resync_interval(&self) -> Duration {
        let secs = self
            .config
            .get_int(RESYNC_INTERVAL_PROPERTY)
            .ok()
            .filter(|secs| *secs > 0)
            .map(|secs| secs as u64)
            .unwrap_or(DEFAULT_RESYNC_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    pub fn http_address(&self) -> String {
        self.config
            .get_string(HTTP_ADDRESS_PROPERTY)
            .unwrap_or("0.0.0.0".to_string())
    }

    /// Listen port; values outside the `u16` range fall back to the default
    pub fn http_port(&self) -> u16 {
        self.config
            .get_int(HTTP_PORT_PROPERTY)
            .ok()
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(DEFAULT_HTTP_PORT)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOGS_PATH_PROPERTY).ok(),
            self.config.get_bool(LOGS_CONSOLE_PROPERTY).unwrap_or(true),
            self.config.get_bool(LOGS_FILE_PROPERTY).unwrap_or(false),
            self.config
                .get_string(LOGS_LEVEL_PROPERTY)
                .unwrap_or("info".to_string()),
        )
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            ready_timeout: self.ready_timeout(),
            namespace: self.namespace(),
            cluster_id: self.cluster_id(),
        }
    }
}
