//! Error types for the gateway
//!
//! Backends report [`DriverError`]s; the gateway wraps them with the routine
//! and parameter names of the failing call. Parameter values never appear in
//! any error produced here.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Broad classification of a driver failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// No usable connection could be obtained; the statement never ran
    Connection,
    /// The server rejected or failed the statement
    Statement,
}

/// Failure reported by a database backend
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
    /// Server-side error code (SQLSTATE for PostgreSQL), when known
    pub code: Option<String>,
}

impl DriverError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Connection,
            message: message.into(),
            code: None,
        }
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Statement,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether the failure happened before the statement reached the server
    pub fn is_transient(&self) -> bool {
        self.kind == DriverErrorKind::Connection
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DriverError::connection("timed out waiting for a pooled connection"),
            sqlx::Error::PoolClosed => DriverError::connection("connection pool is closed"),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned());
                let error = DriverError::statement(db_err.message().to_string());
                match code {
                    Some(code) => error.with_code(code),
                    None => error,
                }
            }
            other => DriverError::statement(other.to_string()),
        }
    }
}

/// Gateway error taxonomy
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The pool could not be established or no connection could be checked out
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// A routine call failed at the driver or server
    #[error("Routine '{routine}' failed (parameters: [{}]): {source}", .parameters.join(", "))]
    Database {
        routine: String,
        /// Parameter names only; values are never recorded
        parameters: Vec<String>,
        #[source]
        source: DriverError,
    },

    /// Begin, commit or rollback failed at the driver
    #[error("Transaction error: {message}")]
    Transaction { message: String },

    /// A transaction scope was used after it had been terminated
    #[error("Invalid transaction state: {message}")]
    InvalidState { message: String },

    /// The call description itself is malformed; no I/O was attempted
    #[error("Invalid routine call: {message}")]
    InvalidCall { message: String },

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
}

impl GatewayError {
    pub fn connection(message: impl Into<String>) -> Self {
        GatewayError::Connection { message: message.into() }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        GatewayError::Transaction { message: message.into() }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        GatewayError::InvalidState { message: message.into() }
    }

    pub fn invalid_call(message: impl Into<String>) -> Self {
        GatewayError::InvalidCall { message: message.into() }
    }

    /// Stable machine-readable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Connection { .. } => "connection",
            GatewayError::Database { .. } => "database",
            GatewayError::Transaction { .. } => "transaction",
            GatewayError::InvalidState { .. } => "invalid_state",
            GatewayError::InvalidCall { .. } => "invalid_call",
            GatewayError::Timeout { .. } => "timeout",
        }
    }

    /// Whether a later attempt outside a transaction may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Connection { .. } => true,
            GatewayError::Database { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_lists_names_not_values() {
        let error = GatewayError::Database {
            routine: "billing.charge".to_string(),
            parameters: vec!["account_id".to_string(), "amount".to_string()],
            source: DriverError::statement("insufficient funds").with_code("P0001"),
        };
        let message = error.to_string();
        assert!(message.contains("billing.charge"));
        assert!(message.contains("account_id, amount"));
        assert!(message.contains("insufficient funds"));
        assert_eq!(error.kind(), "database");
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_connection_failures_are_retryable() {
        assert!(GatewayError::connection("refused").is_retryable());

        let checkout = GatewayError::Database {
            routine: "r".to_string(),
            parameters: vec![],
            source: DriverError::connection("pool timed out"),
        };
        assert!(checkout.is_retryable());
        assert!(!GatewayError::invalid_state("committed").is_retryable());
    }

    #[test]
    fn test_pool_timeout_maps_to_connection_kind() {
        let error = DriverError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(error.kind, DriverErrorKind::Connection);
        let error = DriverError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.kind, DriverErrorKind::Statement);
    }
}
