//! Numeric value validators

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Range and integrality constraints on a number
#[derive(Debug, Clone, Default)]
pub struct NumericValidator {
    /// Minimum value (inclusive)
    pub min: Option<f64>,
    /// Maximum value (inclusive)
    pub max: Option<f64>,
    pub integer_only: bool,
    pub message: Option<String>,
}

impl NumericValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn integer_only(mut self) -> Self {
        self.integer_only = true;
        self
    }

    /// Strictly greater than zero, as an integer. Typical for identifiers.
    pub fn positive_integer() -> Self {
        Self::new().min(1.0).integer_only()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn fail(&self, field: &str, default_message: String, code: &str) -> ValidationResult<()> {
        let message = self.message.clone().unwrap_or(default_message);
        Err(ValidationError::with_code(field, message, code).into())
    }
}

#[async_trait]
impl ValidationRule for NumericValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        let number = match value {
            Value::Null => return Ok(()),
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(number) = number.filter(|n| n.is_finite()) else {
            return self.fail(field, format!("{} must be a number", field), "invalid_type");
        };

        if self.integer_only && number.fract() != 0.0 {
            return self.fail(field, format!("{} must be an integer", field), "not_integer");
        }
        if let Some(min) = self.min.filter(|min| number < *min) {
            return self.fail(field, format!("{} must be at least {}", field, min), "numeric_min");
        }
        if let Some(max) = self.max.filter(|max| number > *max) {
            return self.fail(field, format!("{} must be at most {}", field, max), "numeric_max");
        }
        Ok(())
    }

    fn rule_name(&self) -> &'static str {
        "numeric"
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({"min": self.min, "max": self.max, "integer_only": self.integer_only}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_range() {
        let validator = NumericValidator::new().range(1.0, 10.0);
        assert!(validator.validate(&json!(5), "qty").await.is_ok());
        assert!(validator.validate(&json!(10.0), "qty").await.is_ok());

        let errors = validator.validate(&json!(0), "qty").await.unwrap_err();
        assert_eq!(errors.get_field_errors("qty")[0].code, "numeric_min");
        let errors = validator.validate(&json!(11), "qty").await.unwrap_err();
        assert_eq!(errors.get_field_errors("qty")[0].code, "numeric_max");
    }

    #[tokio::test]
    async fn test_positive_integer() {
        let validator = NumericValidator::positive_integer();
        assert!(validator.validate(&json!(3), "id").await.is_ok());
        assert!(validator.validate(&json!(0), "id").await.is_err());
        assert!(validator.validate(&json!(2.5), "id").await.is_err());
        assert!(validator.validate(&json!("abc"), "id").await.is_err());
    }
}
