use anyhow::Context;
use sluice::prelude::*;
use sluice_http::{init_logging, LoggingConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    init_logging(LoggingConfig::for_app(&config))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tracing::info!(
        "sluice {} starting; database {}",
        sluice::VERSION,
        config.database.endpoint()
    );

    let server = Server::new(config, Arc::new(PostgresBackend::new()));
    let router = server.api_router().build();
    server.run(router).await
}
