//! Lazily created, shared connection pool

use crate::backends::{DatabaseBackend, DatabasePool};
use crate::error::{GatewayError, GatewayResult};
use sluice_core::DatabaseConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Owns the one live pool for a gateway.
///
/// The pool is created on first [`acquire`](Self::acquire). Racing first
/// callers all await the same initialization; a failed initialization is not
/// remembered, so the next caller connects again.
pub struct ConnectionPool {
    backend: Arc<dyn DatabaseBackend>,
    config: DatabaseConfig,
    cell: OnceCell<Arc<dyn DatabasePool>>,
}

impl ConnectionPool {
    pub fn new(backend: Arc<dyn DatabaseBackend>, config: DatabaseConfig) -> Self {
        Self {
            backend,
            config,
            cell: OnceCell::new(),
        }
    }

    /// Return the live pool, connecting first if needed
    pub async fn acquire(&self) -> GatewayResult<Arc<dyn DatabasePool>> {
        let pool = self
            .cell
            .get_or_try_init(|| async {
                tracing::debug!(
                    "Creating {} pool for {} (max_connections={}, min_connections={})",
                    self.backend.name(),
                    self.config.endpoint(),
                    self.config.max_connections,
                    self.config.min_connections
                );

                match self.backend.create_pool(&self.config).await {
                    Ok(pool) => {
                        tracing::info!("Database pool connected to {}", self.config.endpoint());
                        Ok(pool)
                    }
                    Err(e) => {
                        tracing::error!("Failed to create database pool: {}", e);
                        Err(GatewayError::connection(e.message))
                    }
                }
            })
            .await?;

        Ok(Arc::clone(pool))
    }

    /// Whether the pool has been created
    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Close the pool if it was ever opened
    pub async fn close(&self) {
        if let Some(pool) = self.cell.get() {
            tracing::info!("Closing database pool");
            pool.close().await;
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("backend", &self.backend.name())
            .field("endpoint", &self.config.endpoint())
            .field("connected", &self.is_connected())
            .finish()
    }
}
