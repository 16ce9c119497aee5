//! # sluice
//!
//! Validated, authorized HTTP access to stored database routines.
//!
//! This is the umbrella package: it re-exports every sluice crate and
//! provides the [`Server`] that wires configuration, the gateway and the
//! router together.

// Re-export all sub-packages as modules
pub use sluice_auth as auth;
pub use sluice_core as core;
pub use sluice_gateway as gateway;
pub use sluice_http as http;
pub use sluice_validation as validation;

pub mod prelude;
pub mod server;

pub use server::Server;

/// Current version of sluice
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
