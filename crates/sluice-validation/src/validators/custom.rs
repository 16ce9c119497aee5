//! Custom validation functions and closures

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub type ValidationFn = Arc<dyn Fn(&Value, &str) -> ValidationResult<()> + Send + Sync>;

/// A named rule backed by a closure
#[derive(Clone)]
pub struct CustomValidator {
    pub name: String,
    check: ValidationFn,
    pub message: Option<String>,
}

impl CustomValidator {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, &str) -> ValidationResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
            message: None,
        }
    }

    /// Replace the message of every violation this rule reports
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Accept only one of the listed strings
    pub fn one_of<I, S>(name: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        Self::new(name, move |value, field| match value.as_str() {
            Some(text) if allowed.iter().any(|a| a == text) => Ok(()),
            _ => Err(ValidationError::with_code(
                field,
                format!("{} must be one of: {}", field, allowed.join(", ")),
                "not_in_list",
            )
            .context(json!({"allowed": allowed}))
            .into()),
        })
    }
}

impl std::fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish()
    }
}

#[async_trait]
impl ValidationRule for CustomValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        match ((self.check)(value, field), &self.message) {
            (Err(errors), Some(message)) => Err(errors
                .into_iter()
                .map(|mut error| {
                    error.message = message.clone();
                    error
                })
                .collect()),
            (result, _) => result,
        }
    }

    fn rule_name(&self) -> &'static str {
        "custom"
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({"name": self.name}))
    }
}
