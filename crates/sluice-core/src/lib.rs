//! # sluice-core
//!
//! Configuration shared by every sluice crate: the application environment,
//! the HTTP bind address and the database endpoint the gateway connects to.

pub mod config;

pub use config::{AppConfig, AppConfigTrait, ConfigError, DatabaseConfig, Environment};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
