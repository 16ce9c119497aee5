//! Error handling middleware
//!
//! The outermost layer. Logs every [`ErrorReport`] with the request method
//! and path and adds `details.trace` when diagnostics are exposed. A 4xx or
//! 5xx response that carries no report, such as axum's own 405, is replaced
//! with an envelope under the same status.

use crate::envelope::ResponseEnvelope;
use crate::errors::{ErrorReport, HttpError};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sluice_core::AppConfig;
use std::any::Any;
use tracing::{debug, error, warn};

/// Error handling middleware configuration
#[derive(Debug, Clone)]
pub struct ErrorHandlerConfig {
    /// Add internal diagnostics to error envelopes (never in production)
    pub expose_diagnostics: bool,

    /// Whether to log errors
    pub log_errors: bool,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self {
            expose_diagnostics: cfg!(debug_assertions),
            log_errors: true,
        }
    }
}

impl ErrorHandlerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            expose_diagnostics: config.expose_error_details && !config.environment.is_production(),
            log_errors: true,
        }
    }

    pub fn with_diagnostics(mut self, expose: bool) -> Self {
        self.expose_diagnostics = expose;
        self
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.log_errors = enable;
        self
    }
}

/// Middleware function; mount with `axum::middleware::from_fn_with_state`
pub async fn handle_errors(
    State(config): State<ErrorHandlerConfig>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();

    match response.extensions().get::<ErrorReport>().cloned() {
        Some(report) => {
            if config.log_errors {
                log_report(&method, &path, status, &report);
            }
            if config.expose_diagnostics && !report.validation {
                attach_trace(response, &report.diagnostic).await
            } else {
                response
            }
        }
        None if status.is_client_error() || status.is_server_error() => {
            let error = unreported(status);
            if config.log_errors {
                log_report(&method, &path, status, &error.report());
            }
            let mut replacement = error.into_response();
            if let Some(allow) = response.headers().get(header::ALLOW) {
                replacement.headers_mut().insert(header::ALLOW, allow.clone());
            }
            replacement
        }
        None => response,
    }
}

/// Error for a response another layer produced without an envelope
fn unreported(status: StatusCode) -> HttpError {
    let reason = status.canonical_reason().unwrap_or("Request failed");
    if status.is_server_error() {
        HttpError::with_status(status, format!("{} answered without an error report", reason))
    } else {
        HttpError::with_status(status, reason)
    }
}

fn log_report(method: &Method, path: &str, status: StatusCode, report: &ErrorReport) {
    if report.validation {
        debug!("{} {} -> {} {}: {}", method, path, status.as_u16(), report.code, report.diagnostic);
    } else if status.is_client_error() {
        warn!("{} {} -> {} {}: {}", method, path, status.as_u16(), report.code, report.diagnostic);
    } else {
        error!("{} {} -> {} {}: {}", method, path, status.as_u16(), report.code, report.diagnostic);
    }
}

/// Rewrite the envelope body with `error.details.trace`
async fn attach_trace(response: Response, trace: &str) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("Failed to buffer error response: {}", e);
            return ResponseEnvelope::<Value>::failure("Internal server error", None).into_response();
        }
    };

    let mut envelope: Value = match serde_json::from_slice(&bytes) {
        Ok(envelope) => envelope,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    if let Some(error) = envelope.get_mut("error").and_then(Value::as_object_mut) {
        let details = error.entry("details").or_insert_with(|| json!({}));
        if details.is_null() {
            *details = json!({});
        }
        if let Some(map) = details.as_object_mut() {
            map.insert("trace".to_string(), Value::String(trace.to_string()));
        }
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(envelope.to_string()))
}

/// Panic handler for `tower_http::catch_panic::CatchPanicLayer::custom`
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic occurred".to_string()
    };

    HttpError::internal(format!("handler panicked: {}", message)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::Environment;

    #[test]
    fn test_config_follows_environment() {
        let mut config = AppConfig::new();
        assert!(ErrorHandlerConfig::from_app_config(&config).expose_diagnostics);

        config.environment = Environment::Production;
        assert!(!ErrorHandlerConfig::from_app_config(&config).expose_diagnostics);

        config.environment = Environment::Development;
        config.expose_error_details = false;
        assert!(!ErrorHandlerConfig::from_app_config(&config).expose_diagnostics);
    }

    #[test]
    fn test_unreported_statuses_keep_their_status() {
        let not_allowed = unreported(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(not_allowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(not_allowed.error_code(), "METHOD_NOT_ALLOWED");
        assert_eq!(not_allowed.client_message(), "Method Not Allowed");

        let unavailable = unreported(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.error_code(), "INTERNAL_SERVER_ERROR");
        assert_eq!(unavailable.client_message(), "Internal server error");
    }

    #[test]
    fn test_panic_response_is_enveloped() {
        let response = panic_response(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert!(report.diagnostic.contains("kaboom"));
    }

    #[tokio::test]
    async fn test_attach_trace() {
        let response = HttpError::internal("secret detail").into_response();
        let response = attach_trace(response, "secret detail").await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["details"]["trace"], json!("secret detail"));
        assert_eq!(body["error"]["message"], json!("Internal server error"));
    }
}
