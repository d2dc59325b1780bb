//! Server configuration and HTTP response models

pub mod config;
pub mod response;

pub use config::{Cli, Configuration};
pub use response::RestResult;
