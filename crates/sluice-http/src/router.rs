//! Versioned API router
//!
//! ```text
//! GET  /health
//!      /api/{version}/external/...   no credentials required
//!      /api/{version}/internal/...   bearer credential required
//! ```

use crate::errors::HttpError;
use crate::health::health_check_handler;
use crate::middleware::{handle_errors, panic_response, require_bearer, ErrorHandlerConfig};
use axum::http::Uri;
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::Level;

/// Composes the health route, both API tiers and the middleware stack into
/// one `axum::Router`.
///
/// Layers from the outside in: error handling, request tracing, panic
/// recovery. Unknown routes answer with a `NOT_FOUND` envelope.
#[derive(Debug)]
pub struct ApiRouter {
    version: String,
    external: Option<Router>,
    internal: Option<Router>,
    error_config: ErrorHandlerConfig,
}

impl ApiRouter {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            external: None,
            internal: None,
            error_config: ErrorHandlerConfig::default(),
        }
    }

    /// Routes mounted under `/api/{version}/external`
    pub fn external(mut self, router: Router) -> Self {
        self.external = Some(match self.external {
            Some(existing) => existing.merge(router),
            None => router,
        });
        self
    }

    /// Routes mounted under `/api/{version}/internal`
    pub fn internal(mut self, router: Router) -> Self {
        self.internal = Some(match self.internal {
            Some(existing) => existing.merge(router),
            None => router,
        });
        self
    }

    pub fn error_handling(mut self, config: ErrorHandlerConfig) -> Self {
        self.error_config = config;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn build(self) -> Router {
        let prefix = format!("/api/{}", self.version);
        let mut router = Router::new().route("/health", get(health_check_handler));

        if let Some(external) = self.external {
            router = router.nest(&format!("{}/external", prefix), external);
        }
        if let Some(internal) = self.internal {
            let internal = internal.route_layer(axum::middleware::from_fn(require_bearer));
            router = router.nest(&format!("{}/internal", prefix), internal);
        }

        router
            .fallback(not_found)
            .layer(CatchPanicLayer::custom(panic_response))
            // Failures are logged once, by the error middleware
            .layer(TraceLayer::new_for_http().on_failure(DefaultOnFailure::new().level(Level::DEBUG)))
            .layer(axum::middleware::from_fn_with_state(self.error_config, handle_errors))
    }
}

async fn not_found(uri: Uri) -> HttpError {
    HttpError::not_found(uri.path().to_string())
}
