//! Main entry point for the Bridgeport server.

use std::sync::Arc;

use anyhow::Context;
use bridgeport_reconcile::{KubeSecretStore, Reconciler};
use bridgeport_registry::{DefaultWatcherFactory, MemoryCache};
use bridgeport_server::{
    controller::{BridgeController, watch_bridges},
    model::Configuration,
    startup,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let namespace = configuration.namespace();
    let bridge_name = configuration.bridge_name();
    info!(
        namespace = %namespace,
        bridge = %bridge_name,
        cluster_id = %configuration.cluster_id(),
        "Starting Bridgeport"
    );

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let reconciler = Reconciler::new(
        Arc::new(MemoryCache::new()),
        Arc::new(DefaultWatcherFactory::new()),
        Arc::new(KubeSecretStore::new(client.clone())),
        Arc::new(|| debug!("Service cache updated")),
        configuration.reconciler_config(),
    );
    let status = reconciler.status_view();

    let shutdown = startup::wait_for_shutdown_signal().await;

    let (updates_tx, updates_rx) = mpsc::channel(16);
    let watch_handle = tokio::spawn(watch_bridges(client, namespace, bridge_name, updates_tx));
    let controller = BridgeController::new(reconciler, configuration.resync_interval());
    let controller_handle = tokio::spawn(controller.run(updates_rx, shutdown.subscribe()));

    let address = configuration.http_address();
    let port = configuration.http_port();
    let server = startup::registry_server(status, address.clone(), port)
        .with_context(|| format!("Failed to bind HTTP server on {}:{}", address, port))?;
    info!(address = %address, port, "Registry status API listening");

    let server_handle = server.handle();
    let mut server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server_shutdown.recv().await;
        server_handle.stop(true).await;
    });

    let result = server.await;

    // The server may also exit on its own; make sure everything else stops.
    shutdown.shutdown();
    watch_handle.abort();
    if let Err(e) = controller_handle.await {
        tracing::error!(error = %e, "Controller task failed");
    }

    info!("Bridgeport stopped");
    result.context("HTTP server failed")
}
