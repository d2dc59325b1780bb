//! HTTP server setup

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};
use bridgeport_reconcile::RegistryStatusView;

use crate::api;

/// Create and bind the status API server. Shutdown is driven by the
/// server's handle, not by its own signal handlers.
pub fn registry_server(
    status: RegistryStatusView,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    let status = web::Data::new(status);
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(status.clone())
            .configure(api::routes)
    })
    .disable_signals()
    .bind((address, port))?
    .run())
}
