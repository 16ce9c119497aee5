pub mod app_config;
pub mod database;
pub mod error;

pub use app_config::*;
pub use database::*;
pub use error::*;

use std::env;
use std::str::FromStr;

/// Read an optional environment variable and parse it, reporting the
/// offending value on failure.
pub(crate) fn parse_env<T: FromStr>(var: &str, expected: &str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(var, raw, expected)),
        Err(_) => Ok(None),
    }
}
