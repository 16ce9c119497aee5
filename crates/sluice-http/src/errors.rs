//! HTTP error types
//!
//! Every failure that leaves a handler is an [`HttpError`]. Rendering it
//! produces the error envelope and attaches an [`ErrorReport`] carrying the
//! internal diagnostic, which only the error middleware reads.

use crate::envelope::ResponseEnvelope;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use sluice_auth::AuthError;
use sluice_gateway::GatewayError;
use sluice_validation::ValidationErrors;
use thiserror::Error;

/// Result type for HTTP handlers
pub type HttpResult<T> = Result<T, HttpError>;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// HTTP errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Access forbidden: {message}")]
    Forbidden { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// A failure known only by its status, such as a framework rejection
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },
}

/// Diagnostic record attached to every rendered [`HttpError`] as a response
/// extension
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub code: &'static str,
    pub diagnostic: String,
    pub validation: bool,
}

impl HttpError {
    /// Create a bad request error
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        HttpError::BadRequest {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized<T: Into<String>>(message: T) -> Self {
        HttpError::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden<T: Into<String>>(message: T) -> Self {
        HttpError::Forbidden {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        HttpError::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an internal error
    pub fn internal<T: Into<String>>(message: T) -> Self {
        HttpError::Internal {
            message: message.into(),
        }
    }

    /// Keep a status that no other variant models. 4xx messages reach the
    /// client; 5xx messages stay in the report.
    pub fn with_status<T: Into<String>>(status: StatusCode, message: T) -> Self {
        HttpError::Status {
            status,
            message: message.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::Validation(_) | HttpError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            HttpError::Forbidden { .. } => StatusCode::FORBIDDEN,
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::Gateway(GatewayError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            HttpError::Gateway(_) | HttpError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::Status { status, .. } => *status,
        }
    }

    /// Get error code for consistent API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            HttpError::Validation(_) => "VALIDATION_ERROR",
            HttpError::BadRequest { .. } => "BAD_REQUEST",
            HttpError::Unauthorized { .. } => "UNAUTHORIZED",
            HttpError::Forbidden { .. } => "FORBIDDEN",
            HttpError::NotFound { .. } => "NOT_FOUND",
            HttpError::Gateway(err) => match err {
                GatewayError::Connection { .. } => "DATABASE_UNAVAILABLE",
                GatewayError::Database { .. } => "DATABASE_ERROR",
                GatewayError::Transaction { .. } | GatewayError::InvalidState { .. } => "TRANSACTION_ERROR",
                GatewayError::Timeout { .. } => "DATABASE_TIMEOUT",
                GatewayError::InvalidCall { .. } => "INTERNAL_SERVER_ERROR",
            },
            HttpError::Internal { .. } => "INTERNAL_SERVER_ERROR",
            HttpError::Status { status, .. } => match *status {
                StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
                StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
                StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
                status if status.is_client_error() => "BAD_REQUEST",
                _ => "INTERNAL_SERVER_ERROR",
            },
        }
    }

    /// The message clients see. Server-side failures get a generic message;
    /// the specifics stay in the [`ErrorReport`].
    pub fn client_message(&self) -> String {
        match self {
            HttpError::Validation(_) => "Validation failed".to_string(),
            HttpError::BadRequest { message }
            | HttpError::Unauthorized { message }
            | HttpError::Forbidden { message } => message.clone(),
            HttpError::NotFound { resource } => format!("Resource not found: {}", resource),
            HttpError::Gateway(err) => match err {
                GatewayError::Connection { .. } => "Database unavailable".to_string(),
                GatewayError::Database { .. } => "Database operation failed".to_string(),
                GatewayError::Transaction { .. } | GatewayError::InvalidState { .. } => {
                    "Transaction failed".to_string()
                }
                GatewayError::Timeout { .. } => "Database operation timed out".to_string(),
                GatewayError::InvalidCall { .. } => INTERNAL_MESSAGE.to_string(),
            },
            HttpError::Internal { .. } => INTERNAL_MESSAGE.to_string(),
            HttpError::Status { status, message } if status.is_client_error() => message.clone(),
            HttpError::Status { .. } => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Structured details for the envelope
    pub fn details(&self) -> Option<Value> {
        match self {
            HttpError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.error_code(),
            diagnostic: self.to_string(),
            validation: matches!(self, HttpError::Validation(_)),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let report = self.report();
        let envelope = ResponseEnvelope::<Value>::error(report.code, self.client_message(), self.details());

        let mut response = (status, Json(envelope)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

impl From<ValidationErrors> for HttpError {
    fn from(errors: ValidationErrors) -> Self {
        HttpError::Validation(errors)
    }
}

impl From<AuthError> for HttpError {
    fn from(err: AuthError) -> Self {
        match err.status_code() {
            401 => HttpError::unauthorized(err.to_string()),
            403 => HttpError::forbidden(err.to_string()),
            _ => HttpError::internal(format!("{} ({})", err, err.error_code())),
        }
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        HttpError::internal(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::internal(format!("JSON serialization error: {}", err))
    }
}
