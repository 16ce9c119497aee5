//! End-to-end tests: router, pipeline, gateway and error middleware over the
//! in-memory backend.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sluice_auth::{AuthContext, Identity, PermissionGate, SecurityRequirement, StaticIdentityProvider, TokenIdentityProvider};
use sluice_core::DatabaseConfig;
use sluice_gateway::backends::memory::argument;
use sluice_gateway::{DatabaseGateway, DatabaseValue, MemoryBackend, ProcedureCall, Record};
use sluice_http::{
    ApiRouter, CrudController, ErrorHandlerConfig, HttpError, HttpResult, RequestInput, ResponseEnvelope,
};
use sluice_validation::{FieldSchema, Schema};
use std::io;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Clone)]
struct AppState {
    gateway: DatabaseGateway,
    accounts: CrudController,
}

fn backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.seed(
        "accounts",
        (1..=3)
            .map(|id| Record::new().with("id", id).with("owner", format!("owner-{}", id)))
            .collect(),
    );
    backend.register("accounts.get_account", |tables, args| {
        let id = argument(args, "id").and_then(DatabaseValue::as_i64);
        let rows = tables
            .get("accounts")
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get("id").and_then(DatabaseValue::as_i64) == id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(vec![rows])
    });
    backend
}

fn accounts_schema() -> Arc<Schema> {
    Arc::new(Schema::new().field("id", FieldSchema::integer().required()))
}

async fn get_account(State(state): State<AppState>, input: RequestInput) -> HttpResult<ResponseEnvelope> {
    let (_auth, params) = state.accounts.read(&input).await.into_result()?;
    let call = ProcedureCall::new("accounts.get_account").bind_all(params.into_parameters());
    let output = state.gateway.execute(&call, None).await?;
    Ok(ResponseEnvelope::success(serde_json::to_value(output)?))
}

async fn missing_routine(State(state): State<AppState>, input: RequestInput) -> HttpResult<ResponseEnvelope> {
    let (_auth, params) = state.accounts.read(&input).await.into_result()?;
    let call = ProcedureCall::new("accounts.missing")
        .bind_all(params.into_parameters())
        .bind("secret", "hunter2");
    state.gateway.execute(&call, None).await?;
    Ok(ResponseEnvelope::success(Value::Null))
}

async fn boom() -> &'static str {
    panic!("handler exploded")
}

async fn fails() -> HttpResult<ResponseEnvelope> {
    Err(HttpError::internal("routine blew up"))
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn echo(Json(body): Json<Value>) -> ResponseEnvelope {
    ResponseEnvelope::success(body)
}

fn app_with(gate: PermissionGate, diagnostics: bool) -> Router {
    let gateway = DatabaseGateway::new(Arc::new(backend()), DatabaseConfig::default());
    let accounts = CrudController::new("accounts", accounts_schema(), gate)
        .requires(SecurityRequirement::new("accounts", "read"));
    let state = AppState { gateway, accounts };

    let external = Router::new()
        .route("/accounts", get(get_account).post(get_account))
        .route("/accounts/:id", get(get_account).post(get_account))
        .route("/broken/:id", get(missing_routine))
        .route("/boom", get(boom))
        .route("/fails", get(fails))
        .route("/unavailable", get(unavailable))
        .route("/echo", axum::routing::post(echo))
        .with_state(state.clone());
    let internal = Router::new()
        .route("/accounts/:id", get(get_account))
        .with_state(state);

    ApiRouter::new("v1")
        .external(external)
        .internal(internal)
        .error_handling(ErrorHandlerConfig::default().with_diagnostics(diagnostics))
        .build()
}

fn app() -> Router {
    app_with(PermissionGate::new(Arc::new(StaticIdentityProvider::default())), true)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = send(app(), get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn read_returns_enveloped_record() {
    let (status, body) = send(app(), get_request("/api/v1/external/accounts/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!({"id": 2, "owner": "owner-2"}));
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn missing_row_is_null_data() {
    let (status, body) = send(app(), get_request("/api/v1/external/accounts/99")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn missing_required_field_is_a_validation_error() {
    let (status, body) = send(app(), post_json("/api/v1/external/accounts", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    assert_eq!(body["error"]["message"], json!("Validation failed"));
    assert_eq!(body["error"]["details"][0]["field"], json!("id"));
    assert_eq!(body["error"]["details"][0]["code"], json!("required"));
}

#[tokio::test]
async fn query_strings_are_coerced_and_checked() {
    let (status, body) = send(app(), get_request("/api/v1/external/accounts?id=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(3));

    let (status, body) = send(app(), get_request("/api/v1/external/accounts?id=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["code"], json!("invalid_type"));
}

#[tokio::test]
async fn body_overrides_query_overrides_path() {
    let (status, body) = send(app(), post_json("/api/v1/external/accounts/1?id=2", json!({"id": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(3));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/external/accounts/1")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn internal_tier_requires_a_bearer_token() {
    let (status, body) = send(app(), get_request("/api/v1/internal/accounts/1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("UNAUTHORIZED"));

    let request = Request::builder()
        .uri("/api/v1/internal/accounts/1")
        .header(header::AUTHORIZATION, "Bearer anything")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(1));
}

#[tokio::test]
async fn missing_permission_is_forbidden() {
    let provider = TokenIdentityProvider::new()
        .with_token("auditor", Identity::new(AuthContext::new(5, 6).unwrap()).grant("ledger:read"))
        .with_token("reader", Identity::new(AuthContext::new(5, 7).unwrap()).grant("accounts:*"));
    let gate = PermissionGate::new(Arc::new(provider));

    let request = |token: &str| {
        Request::builder()
            .uri("/api/v1/internal/accounts/1")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(app_with(gate.clone(), false), request("auditor")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("FORBIDDEN"));

    let (status, _) = send(app_with(gate.clone(), false), request("stranger")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app_with(gate, false), request("reader")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn database_failures_never_leak_values() {
    let (status, body) = send(app(), get_request("/api/v1/external/broken/1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], json!("DATABASE_ERROR"));
    assert_eq!(body["error"]["message"], json!("Database operation failed"));

    let trace = body["error"]["details"]["trace"].as_str().unwrap();
    assert!(trace.contains("accounts.missing"));
    assert!(trace.contains("secret"));
    assert!(!body.to_string().contains("hunter2"));
}

#[tokio::test]
async fn panics_become_enveloped_500s() {
    let (status, body) = send(app(), get_request("/api/v1/external/boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("INTERNAL_SERVER_ERROR"));
    assert_eq!(body["error"]["message"], json!("Internal server error"));
    assert!(body["error"]["details"]["trace"]
        .as_str()
        .unwrap()
        .contains("handler exploded"));
}

#[tokio::test]
async fn diagnostics_stay_hidden_when_disabled() {
    let gate = PermissionGate::new(Arc::new(StaticIdentityProvider::default()));
    let (status, body) = send(app_with(gate, false), get_request("/api/v1/external/boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].get("details").is_none());
    assert!(!body.to_string().contains("handler exploded"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (status, body) = send(app(), get_request("/api/v1/external/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn wrong_method_is_enveloped() {
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/external/boom")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.headers().contains_key(header::ALLOW));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("METHOD_NOT_ALLOWED"));
    assert_eq!(body["error"]["message"], json!("Method Not Allowed"));
}

#[tokio::test]
async fn extractor_rejections_are_enveloped() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/external/echo")
        .body(Body::from(r#"{"a":1}"#))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], json!("UNSUPPORTED_MEDIA_TYPE"));

    let (status, body) = send(app(), post_json("/api/v1/external/echo", json!({"a": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"a": 1}));
}

#[tokio::test]
async fn bare_server_errors_are_enveloped() {
    let (status, body) = send(app(), get_request("/api/v1/external/unavailable")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("INTERNAL_SERVER_ERROR"));
    assert_eq!(body["error"]["message"], json!("Internal server error"));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn server_errors_are_logged_once() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (status, _) = send(app(), get_request("/api/v1/external/fails")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    let errors: Vec<&str> = output
        .lines()
        .filter(|line| line.trim_start().starts_with("ERROR"))
        .collect();
    assert_eq!(errors.len(), 1, "{}", output);
    assert!(errors[0].contains("routine blew up"));
}
