//! Liveness route

use crate::envelope::timestamp;
use axum::Json;
use serde_json::{json, Value};

/// `GET /health`
pub async fn health_check_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp(),
    }))
}
