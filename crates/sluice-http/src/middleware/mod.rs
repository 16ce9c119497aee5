//! HTTP middleware

pub mod auth;
pub mod error_handler;

pub use auth::require_bearer;
pub use error_handler::{handle_errors, panic_response, ErrorHandlerConfig};
