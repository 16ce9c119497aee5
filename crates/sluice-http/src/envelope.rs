//! The uniform JSON response envelope
//!
//! ```json
//! {"success": true, "data": {...}, "timestamp": "2024-05-01T12:00:00.000Z"}
//! {"success": false, "error": {"code": "...", "message": "...", "details": ...}, "timestamp": "..."}
//! ```

use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current time as RFC 3339, UTC, millisecond precision, `Z` suffix
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Exactly one of `data` and `error` is present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: String,
}

impl<T> ResponseEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: timestamp(),
        }
    }

    /// A failure with the generic `INTERNAL_SERVER_ERROR` code
    pub fn failure(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::error("INTERNAL_SERVER_ERROR", message, details)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
                details,
            }),
            timestamp: timestamp(),
        }
    }
}

impl<T: Serialize> IntoResponse for ResponseEnvelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
