//! Request input extraction

use crate::errors::HttpError;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Everything a request carries into the pipeline: path captures, query
/// string, JSON object body and the raw `Authorization` header.
///
/// As an extractor it consumes the body, so it must be the last handler
/// argument.
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    pub path: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
    pub authorization: Option<String>,
}

impl RequestInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_authorization(mut self, header: impl Into<String>) -> Self {
        self.authorization = Some(header.into());
        self
    }

    /// One flat map; body overrides query overrides path
    pub fn merged(&self) -> Map<String, Value> {
        let mut merged = self.path.clone();
        for source in [&self.query, &self.body] {
            for (name, value) in source {
                merged.insert(name.clone(), value.clone());
            }
        }
        merged
    }
}

fn strings_to_map(values: HashMap<String, String>) -> Map<String, Value> {
    values.into_iter().map(|(k, v)| (k, Value::String(v))).collect()
}

fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, HttpError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(HttpError::bad_request("Request body must be a JSON object")),
        Err(e) => Err(HttpError::bad_request(format!("Malformed JSON body: {}", e))),
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestInput
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let path = Option::<Path<HashMap<String, String>>>::from_request_parts(&mut parts, state)
            .await
            .ok()
            .flatten()
            .map(|Path(params)| strings_to_map(params))
            .unwrap_or_default();

        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| HttpError::bad_request(format!("Malformed query string: {}", e)))?;

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| HttpError::with_status(e.status(), e.body_text()))?;

        Ok(RequestInput {
            path,
            query: strings_to_map(query),
            body: parse_body(&bytes)?,
            authorization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_precedence() {
        let body = json!({"id": 3}).as_object().cloned().unwrap();
        let input = RequestInput::new()
            .with_path("id", "1")
            .with_path("tenant", "a")
            .with_query("id", "2")
            .with_query("q", "x")
            .with_body(body);

        let merged = input.merged();
        assert_eq!(merged["id"], json!(3));
        assert_eq!(merged["tenant"], json!("a"));
        assert_eq!(merged["q"], json!("x"));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_body_parsing() {
        assert!(parse_body(b"").unwrap().is_empty());
        assert!(parse_body(b"  \n").unwrap().is_empty());
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap()["a"], json!(1));
        assert!(parse_body(b"[1,2]").is_err());
        assert!(parse_body(b"{oops").is_err());
    }

    #[tokio::test]
    async fn test_extracts_query_body_and_authorization() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/things?page=2")
            .header(AUTHORIZATION, "Bearer abc")
            .body(axum::body::Body::from(r#"{"name":"n"}"#))
            .unwrap();

        let input = RequestInput::from_request(request, &()).await.unwrap();
        assert_eq!(input.query["page"], json!("2"));
        assert_eq!(input.body["name"], json!("n"));
        assert_eq!(input.authorization.as_deref(), Some("Bearer abc"));
        assert!(input.path.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_keeps_payload_too_large() {
        let oversized = vec![b' '; 2 * 1024 * 1024 + 1];
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/things")
            .body(axum::body::Body::from(oversized))
            .unwrap();

        let err = RequestInput::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
    }
}
