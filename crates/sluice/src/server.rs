//! Server lifecycle: bind, serve, shut down gracefully, close the pool

use anyhow::Context;
use sluice_core::AppConfig;
use sluice_gateway::{DatabaseBackend, DatabaseGateway};
use sluice_http::{ApiRouter, ErrorHandlerConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Owns the configuration and the gateway for the life of the process
#[derive(Debug, Clone)]
pub struct Server {
    config: AppConfig,
    gateway: DatabaseGateway,
}

impl Server {
    /// No database connection is made until the first routine call
    pub fn new(config: AppConfig, backend: Arc<dyn DatabaseBackend>) -> Self {
        let gateway = DatabaseGateway::new(backend, config.database.clone());
        Self { config, gateway }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gateway(&self) -> &DatabaseGateway {
        &self.gateway
    }

    /// A router builder for the configured API version with error handling
    /// set up for the environment
    pub fn api_router(&self) -> ApiRouter {
        ApiRouter::new(self.config.api_version.clone())
            .error_handling(ErrorHandlerConfig::from_app_config(&self.config))
    }

    /// Serve `router` until Ctrl-C or SIGTERM, then close the pool
    pub async fn run(self, router: axum::Router) -> anyhow::Result<()> {
        let addr = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind to {}", addr))?;

        info!(
            "Server listening on {} (environment: {}, api: /api/{})",
            addr, self.config.environment, self.config.api_version
        );

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error");

        self.gateway.close().await;
        info!("Server stopped");
        served
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down gracefully");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use sluice_gateway::MemoryBackend;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_server_is_lazy() {
        let backend = MemoryBackend::new();
        let server = Server::new(AppConfig::testing(), Arc::new(backend.clone()));
        assert!(!server.gateway().is_connected());
        assert_eq!(backend.pools_created(), 0);
    }

    #[tokio::test]
    async fn test_api_router_serves_health() {
        let server = Server::new(AppConfig::testing(), Arc::new(MemoryBackend::new()));
        let router = server.api_router().build();

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
    }
}
