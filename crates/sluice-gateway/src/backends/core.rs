//! Core Database Backend Traits

use crate::binder::BoundCall;
use crate::error::DriverError;
use crate::record::RawResult;
use async_trait::async_trait;
use sluice_core::DatabaseConfig;
use std::sync::Arc;
use std::time::Duration;

/// Opens connection pools for one kind of database
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Connect and return a ready pool
    async fn create_pool(&self, config: &DatabaseConfig) -> Result<Arc<dyn DatabasePool>, DriverError>;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}

/// A live connection pool
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a bound call on a fresh checkout
    async fn invoke(&self, call: &BoundCall) -> Result<RawResult, DriverError>;

    /// Check out a connection and begin a transaction on it
    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>, DriverError>;

    /// Perform a health check on the pool
    async fn health_check(&self) -> Result<Duration, DriverError>;

    /// Close the pool
    async fn close(&self);
}

/// A driver transaction bound to one checked-out connection.
///
/// `Send` but not `Sync`: one task drives a transaction at a time.
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Run a bound call on the transaction's connection
    async fn invoke(&mut self, call: &BoundCall) -> Result<RawResult, DriverError>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<(), DriverError>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<(), DriverError>;
}
