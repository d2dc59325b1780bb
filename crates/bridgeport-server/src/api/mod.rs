//! HTTP API
//!
//! - `GET /v1/registry/watchers` - status of every active registry watcher
//! - `GET /v1/registry/mcp-servers` - MCP servers discovered by the watchers
//! - `GET /v1/registry/ready` - 200 once every watcher is ready, 503 before
//! - `GET /health/liveness` - process liveness

pub mod health;
pub mod registry;

use actix_web::web;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(registry::routes()).service(health::routes());
}
