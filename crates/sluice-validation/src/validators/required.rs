//! Required field validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

/// Whether a value counts as missing: null, blank text, or an empty collection
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

/// Validator that ensures a field is present and not empty
#[derive(Debug, Clone, Default)]
pub struct RequiredValidator {
    pub message: Option<String>,
}

impl RequiredValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The violation reported for a missing field
    pub fn violation(&self, field: &str) -> ValidationError {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} is required", field));
        ValidationError::with_code(field, message, "required")
    }
}

#[async_trait]
impl ValidationRule for RequiredValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if is_blank(value) {
            Err(self.violation(field).into())
        } else {
            Ok(())
        }
    }

    fn rule_name(&self) -> &'static str {
        "required"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_blank_values_fail() {
        let validator = RequiredValidator::new();
        for value in [json!(null), json!(""), json!("   "), json!([]), json!({})] {
            assert!(validator.validate(&value, "name").await.is_err(), "{}", value);
        }
    }

    #[tokio::test]
    async fn test_zero_and_false_are_present() {
        let validator = RequiredValidator::new();
        assert!(validator.validate(&json!(0), "count").await.is_ok());
        assert!(validator.validate(&json!(false), "active").await.is_ok());
    }

    #[tokio::test]
    async fn test_custom_message() {
        let validator = RequiredValidator::with_message("Tell us your name");
        let errors = validator.validate(&json!(null), "name").await.unwrap_err();
        assert_eq!(errors.get_field_errors("name")[0].message, "Tell us your name");
        assert_eq!(errors.get_field_errors("name")[0].code, "required");
    }
}
