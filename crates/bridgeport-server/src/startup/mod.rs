//! Server startup: logging, HTTP server and shutdown signal handling

pub mod http;
pub mod logging;
pub mod shutdown;

pub use http::registry_server;
pub use logging::{LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};
