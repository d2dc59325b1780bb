//! Registry status endpoints

use actix_web::{Responder, get, web};
use bridgeport_api::McpServer;
use bridgeport_reconcile::{RegistryStatusView, RegistryWatcherStatus};

use crate::model::RestResult;
use crate::model::response::NOT_READY_CODE;

/// GET /v1/registry/watchers
#[get("watchers")]
async fn watchers(status: web::Data<RegistryStatusView>) -> impl Responder {
    RestResult::<Vec<RegistryWatcherStatus>>::http_success(status.registry_watcher_status_list())
}

/// GET /v1/registry/mcp-servers
#[get("mcp-servers")]
async fn mcp_servers(status: web::Data<RegistryStatusView>) -> impl Responder {
    RestResult::<Vec<McpServer>>::http_success(status.mcp_servers())
}

/// GET /v1/registry/ready
///
/// Readiness probe: succeeds once every active watcher has completed its
/// first sync.
#[get("ready")]
async fn ready(status: web::Data<RegistryStatusView>) -> impl Responder {
    if status.is_ready() {
        return RestResult::<String>::http_success("ok".to_string());
    }

    let pending = status
        .registry_watcher_status_list()
        .into_iter()
        .filter(|w| !w.ready)
        .count();
    RestResult::<String>::http_response(
        503,
        NOT_READY_CODE,
        format!("{} registry watcher(s) not ready", pending),
        "not ready".to_string(),
    )
}

pub fn routes() -> actix_web::Scope {
    web::scope("/v1/registry")
        .service(watchers)
        .service(mcp_servers)
        .service(ready)
}
