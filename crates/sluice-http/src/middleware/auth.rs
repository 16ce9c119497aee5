//! Bearer guard for the internal tier

use crate::errors::HttpError;
use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sluice_auth::Credentials;

/// Reject requests without a bearer credential before any handler runs.
/// Whether the token is any good is the [`PermissionGate`](sluice_auth::PermissionGate)'s call.
pub async fn require_bearer(request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    match Credentials::from_authorization(header.as_deref()) {
        Ok(Credentials::Bearer(_)) => next.run(request).await,
        Ok(Credentials::Anonymous) => HttpError::unauthorized("Bearer token required").into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
