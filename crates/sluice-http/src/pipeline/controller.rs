//! Validate-then-authorize request pipeline

use super::input::RequestInput;
use super::outcome::{Rejection, ValidatedParams, ValidationOutcome};
use futures_util::FutureExt;
use sluice_auth::{Credentials, PermissionGate, SecurityRequirement};
use sluice_validation::{InputSchema, ValidationError, ValidationErrors};
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// CRUD intent, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudIntent {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudIntent::Create => "create",
            CrudIntent::Read => "read",
            CrudIntent::Update => "update",
            CrudIntent::Delete => "delete",
        }
    }
}

impl fmt::Display for CrudIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs every request for one resource through the same steps:
///
/// 1. merge path, query and body (body wins, then query)
/// 2. validate and coerce against the schema
/// 3. authorize through the [`PermissionGate`]
///
/// and answers with exactly one [`ValidationOutcome`]. It never returns an
/// error and never lets a schema panic escape.
#[derive(Clone)]
pub struct CrudController {
    resource: String,
    schema: Arc<dyn InputSchema>,
    gate: PermissionGate,
    requirement: Option<SecurityRequirement>,
}

impl CrudController {
    pub fn new(resource: impl Into<String>, schema: Arc<dyn InputSchema>, gate: PermissionGate) -> Self {
        Self {
            resource: resource.into(),
            schema,
            gate,
            requirement: None,
        }
    }

    /// Require a permission on top of a resolved identity
    pub fn requires(mut self, requirement: SecurityRequirement) -> Self {
        self.requirement = Some(requirement);
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub async fn create(&self, input: &RequestInput) -> ValidationOutcome {
        self.process(CrudIntent::Create, input).await
    }

    pub async fn read(&self, input: &RequestInput) -> ValidationOutcome {
        self.process(CrudIntent::Read, input).await
    }

    pub async fn update(&self, input: &RequestInput) -> ValidationOutcome {
        self.process(CrudIntent::Update, input).await
    }

    pub async fn delete(&self, input: &RequestInput) -> ValidationOutcome {
        self.process(CrudIntent::Delete, input).await
    }

    pub async fn process(&self, intent: CrudIntent, input: &RequestInput) -> ValidationOutcome {
        let params = match self.validate(intent, input).await {
            Ok(params) => params,
            Err(errors) => {
                debug!(
                    "{} {} rejected with {} violation(s)",
                    intent,
                    self.resource,
                    errors.len()
                );
                return ValidationOutcome::Rejected(Rejection::Invalid(errors));
            }
        };

        let authorized = match Credentials::from_authorization(input.authorization.as_deref()) {
            Ok(credentials) => self.gate.authorize(&credentials, self.requirement.as_ref()).await,
            Err(err) => Err(err),
        };

        match authorized {
            Ok(auth) => ValidationOutcome::Accepted { auth, params },
            Err(err) => {
                debug!("{} {} denied: {}", intent, self.resource, err);
                ValidationOutcome::Rejected(Rejection::Denied(err))
            }
        }
    }

    async fn validate(&self, intent: CrudIntent, input: &RequestInput) -> Result<ValidatedParams, ValidationErrors> {
        let merged = input.merged();
        let validated = AssertUnwindSafe(self.schema.validate(merged))
            .catch_unwind()
            .await
            .map_err(|panic| {
                let message = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic");
                error!("Schema for {} {} panicked: {}", intent, self.resource, message);
                ValidationErrors::from(ValidationError::with_code(
                    "input",
                    "Input could not be validated",
                    "validation_failed",
                ))
            })??;

        let types: HashMap<_, _> = validated
            .keys()
            .filter_map(|name| self.schema.field_type(name).map(|t| (name.clone(), t)))
            .collect();
        Ok(ValidatedParams::new(validated, types))
    }
}

impl fmt::Debug for CrudController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudController")
            .field("resource", &self.resource)
            .field("gate", &self.gate)
            .field("requirement", &self.requirement)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use sluice_auth::{AuthContext, Identity, StaticIdentityProvider, TokenIdentityProvider};
    use sluice_validation::{FieldSchema, Schema, ValidationResult};

    fn schema() -> Arc<dyn InputSchema> {
        Arc::new(
            Schema::new()
                .field("id", FieldSchema::integer().required())
                .field("name", FieldSchema::string()),
        )
    }

    fn open_controller() -> CrudController {
        CrudController::new(
            "orders",
            schema(),
            PermissionGate::new(Arc::new(StaticIdentityProvider::default())),
        )
    }

    fn token_controller() -> CrudController {
        let provider = TokenIdentityProvider::new()
            .with_token("reader", Identity::new(AuthContext::new(4, 8).unwrap()).grant("orders:read"));
        CrudController::new("orders", schema(), PermissionGate::new(Arc::new(provider)))
            .requires(SecurityRequirement::new("orders", "read"))
    }

    #[tokio::test]
    async fn test_coerces_query_strings() {
        let outcome = open_controller()
            .read(&RequestInput::new().with_query("id", "5"))
            .await;
        let (auth, params) = outcome.into_result().unwrap();
        assert_eq!(params.get("id"), Some(&json!(5)));
        assert_eq!(auth.account_id(), 1);
    }

    #[tokio::test]
    async fn test_bad_integer_is_invalid() {
        let outcome = open_controller()
            .read(&RequestInput::new().with_query("id", "abc"))
            .await;
        match outcome {
            ValidationOutcome::Rejected(Rejection::Invalid(errors)) => {
                assert_eq!(errors.get_field_errors("id")[0].code, "invalid_type");
            }
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_body_overrides_path() {
        let body = json!({"id": 3}).as_object().cloned().unwrap();
        let input = RequestInput::new().with_path("id", "1").with_query("id", "2").with_body(body);
        let (_, params) = open_controller().update(&input).await.into_result().unwrap();
        assert_eq!(params.get("id"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_validation_runs_before_authorization() {
        // Anonymous and invalid: the violations win
        let outcome = token_controller().read(&RequestInput::new()).await;
        assert!(matches!(outcome, ValidationOutcome::Rejected(Rejection::Invalid(_))));
    }

    #[tokio::test]
    async fn test_authorization_outcomes() {
        let controller = token_controller();
        let input = RequestInput::new().with_query("id", "1");

        let anonymous = controller.read(&input).await;
        assert!(matches!(anonymous, ValidationOutcome::Rejected(Rejection::Denied(_))));

        let granted = controller.read(&input.clone().with_authorization("Bearer reader")).await;
        let (auth, _) = granted.into_result().unwrap();
        assert_eq!((auth.account_id(), auth.user_id()), (4, 8));

        let malformed = controller.read(&input.with_authorization("Basic Zm9v")).await;
        assert!(matches!(malformed, ValidationOutcome::Rejected(Rejection::Denied(_))));
    }

    #[tokio::test]
    async fn test_every_intent_runs_the_same_pipeline() {
        let controller = open_controller();
        let input = RequestInput::new().with_path("id", "9");
        for intent in [CrudIntent::Create, CrudIntent::Read, CrudIntent::Update, CrudIntent::Delete] {
            assert!(controller.process(intent, &input).await.is_accepted(), "{}", intent);
        }
    }

    struct PanickingSchema;

    #[async_trait]
    impl InputSchema for PanickingSchema {
        async fn validate(&self, _input: Map<String, Value>) -> ValidationResult<Map<String, Value>> {
            panic!("schema bug")
        }
    }

    #[tokio::test]
    async fn test_schema_panic_becomes_rejection() {
        let controller = CrudController::new(
            "orders",
            Arc::new(PanickingSchema),
            PermissionGate::new(Arc::new(StaticIdentityProvider::default())),
        );
        match controller.create(&RequestInput::new()).await {
            ValidationOutcome::Rejected(Rejection::Invalid(errors)) => {
                assert_eq!(errors.get_field_errors("input")[0].code, "validation_failed");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
