//! Length-based validators for strings and collections

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Bounds on the length of a string (in characters) or an array
#[derive(Debug, Clone, Default)]
pub struct LengthValidator {
    /// Minimum length (inclusive)
    pub min: Option<usize>,
    /// Maximum length (inclusive)
    pub max: Option<usize>,
    pub message: Option<String>,
}

impl LengthValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(self, min: usize, max: usize) -> Self {
        self.min(min).max(max)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn describe(&self, field: &str) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => format!("{} must be exactly {} long", field, min),
            (Some(min), Some(max)) => format!("{} must be between {} and {} long", field, min, max),
            (Some(min), None) => format!("{} must be at least {} long", field, min),
            (None, Some(max)) => format!("{} must be at most {} long", field, max),
            (None, None) => format!("{} has an invalid length", field),
        }
    }
}

#[async_trait]
impl ValidationRule for LengthValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        let length = match value {
            Value::Null => return Ok(()),
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            _ => {
                return Err(ValidationError::with_code(
                    field,
                    format!("{} must be a string or array for length validation", field),
                    "invalid_type",
                )
                .into())
            }
        };

        let code = if self.min.is_some_and(|min| length < min) {
            "length_min"
        } else if self.max.is_some_and(|max| length > max) {
            "length_max"
        } else {
            return Ok(());
        };

        Err(ValidationError::with_code(field, self.describe(field), code)
            .context(json!({"min": self.min, "max": self.max, "actual": length}))
            .into())
    }

    fn rule_name(&self) -> &'static str {
        "length"
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({"min": self.min, "max": self.max}))
    }
}
