//! The database gateway façade

use crate::backends::{DatabaseBackend, DatabasePool};
use crate::binder::{BoundCall, ParameterBinder};
use crate::call::ProcedureCall;
use crate::error::{DriverError, GatewayError, GatewayResult};
use crate::pool::ConnectionPool;
use crate::shape::{shape_result, RoutineOutput};
use crate::transaction::{TransactionScope, TransactionState};
use sluice_core::DatabaseConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Deadlines and retries applied to every database operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Deadline for one invoke, begin, commit or rollback
    pub call_timeout: Duration,
    /// Extra attempts after a connection failure, outside transactions only
    pub max_retries: u32,
    /// Linear backoff step: attempt `n` waits `n * retry_backoff`
    pub retry_backoff: Duration,
}

impl ExecutionPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            call_timeout: config.call_timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        }
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

/// Executes stored routines and manages transactions over a shared pool.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct DatabaseGateway {
    pool: Arc<ConnectionPool>,
    policy: ExecutionPolicy,
    binder: ParameterBinder,
}

impl DatabaseGateway {
    /// Create a gateway. No connection is made until first use.
    pub fn new(backend: Arc<dyn DatabaseBackend>, config: DatabaseConfig) -> Self {
        let policy = ExecutionPolicy::from_config(&config);
        Self {
            pool: Arc::new(ConnectionPool::new(backend, config)),
            policy,
            binder: ParameterBinder::new(),
        }
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    /// Return the live pool, creating it on first use
    pub async fn acquire_pool(&self) -> GatewayResult<Arc<dyn DatabasePool>> {
        self.pool.acquire().await
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_connected()
    }

    /// Execute a routine and shape its result.
    ///
    /// With a transaction the call runs on the transaction's connection and is
    /// never retried. Without one it runs on a fresh checkout, and connection
    /// failures are retried according to the [`ExecutionPolicy`].
    pub async fn execute(
        &self,
        call: &ProcedureCall,
        transaction: Option<&mut TransactionScope>,
    ) -> GatewayResult<RoutineOutput> {
        let bound = self.binder.bind(call)?;
        debug!(
            routine = %bound.routine,
            parameters = ?bound.parameter_names(),
            shape = ?bound.shape,
            "Executing routine"
        );

        let raw = match transaction {
            Some(scope) => {
                let id = scope.id();
                let connection = scope.connection()?;
                debug!("Routine {} runs inside transaction {}", bound.routine, id);
                let result = self
                    .deadline(format!("routine '{}'", bound.routine), connection.invoke(&bound))
                    .await?;
                result.map_err(|e| routine_error(&bound, e))?
            }
            None => self.invoke_with_retry(&bound).await?,
        };

        Ok(shape_result(raw, bound.shape, call.result_labels()))
    }

    /// Check out a connection and begin a transaction on it
    pub async fn begin_transaction(&self) -> GatewayResult<TransactionScope> {
        let pool = self.acquire_pool().await?;
        let inner = self
            .deadline("begin transaction".to_string(), pool.begin_transaction())
            .await?
            .map_err(|e| {
                if e.is_transient() {
                    GatewayError::connection(e.message)
                } else {
                    GatewayError::transaction(format!("begin failed: {}", e))
                }
            })?;

        let scope = TransactionScope::new(inner);
        debug!("Transaction {} started", scope.id());
        Ok(scope)
    }

    /// Commit a transaction. Fails with `InvalidState` if it already ended.
    pub async fn commit(&self, transaction: &mut TransactionScope) -> GatewayResult<()> {
        let inner = transaction.terminate(TransactionState::Committed)?;
        debug!("Committing transaction {}", transaction.id());
        self.deadline("commit".to_string(), inner.commit())
            .await?
            .map_err(|e| GatewayError::transaction(format!("commit failed: {}", e)))?;
        debug!("Transaction {} committed", transaction.id());
        Ok(())
    }

    /// Roll a transaction back. Fails with `InvalidState` if it already ended.
    pub async fn rollback(&self, transaction: &mut TransactionScope) -> GatewayResult<()> {
        let inner = transaction.terminate(TransactionState::RolledBack)?;
        debug!("Rolling back transaction {}", transaction.id());
        self.deadline("rollback".to_string(), inner.rollback())
            .await?
            .map_err(|e| GatewayError::transaction(format!("rollback failed: {}", e)))?;
        debug!("Transaction {} rolled back", transaction.id());
        Ok(())
    }

    /// Round-trip latency of the pool
    pub async fn health_check(&self) -> GatewayResult<Duration> {
        let pool = self.acquire_pool().await?;
        let latency = self
            .deadline("health check".to_string(), pool.health_check())
            .await?
            .map_err(|e| GatewayError::connection(e.message))?;
        debug!("Database health check passed in {:?}", latency);
        Ok(latency)
    }

    /// Close the pool if it was opened
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn invoke_with_retry(&self, bound: &BoundCall) -> GatewayResult<crate::record::RawResult> {
        let mut attempt = 0;
        loop {
            match self.invoke_once(bound).await {
                Err(err) if err.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let backoff = self.policy.retry_backoff * attempt;
                    warn!(
                        "Routine {} hit a connection failure ({}); retry {} of {} in {:?}",
                        bound.routine, err, attempt, self.policy.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    async fn invoke_once(&self, bound: &BoundCall) -> GatewayResult<crate::record::RawResult> {
        let pool = self.acquire_pool().await?;
        self.deadline(format!("routine '{}'", bound.routine), pool.invoke(bound))
            .await?
            .map_err(|e| routine_error(bound, e))
    }

    async fn deadline<T, F>(&self, operation: String, future: F) -> GatewayResult<T>
    where
        F: Future<Output = T>,
    {
        let after = self.policy.call_timeout;
        tokio::time::timeout(after, future).await.map_err(|_| {
            warn!("{} timed out after {:?}", operation, after);
            GatewayError::Timeout { operation, after }
        })
    }
}

fn routine_error(bound: &BoundCall, source: DriverError) -> GatewayError {
    GatewayError::Database {
        routine: bound.routine.clone(),
        parameters: bound.parameter_names(),
        source,
    }
}
