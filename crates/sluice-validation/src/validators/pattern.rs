//! Pattern-based validators using regular expressions

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

/// Requires a string to match a regular expression in full
#[derive(Debug, Clone)]
pub struct PatternValidator {
    pattern: Regex,
    pub message: Option<String>,
}

impl PatternValidator {
    /// Compile `pattern`, anchored so the whole value must match
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{})$", pattern))?,
            message: None,
        })
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn pattern_string(&self) -> &str {
        self.pattern.as_str()
    }
}

#[async_trait]
impl ValidationRule for PatternValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        let text = match value {
            Value::Null => return Ok(()),
            Value::String(text) => text,
            _ => {
                return Err(ValidationError::with_code(
                    field,
                    format!("{} must be a string for pattern validation", field),
                    "invalid_type",
                )
                .into())
            }
        };

        if self.pattern.is_match(text) {
            return Ok(());
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} does not match the required pattern", field));
        Err(ValidationError::with_code(field, message, "pattern_mismatch").into())
    }

    fn rule_name(&self) -> &'static str {
        "pattern"
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({"pattern": self.pattern.as_str()}))
    }
}
