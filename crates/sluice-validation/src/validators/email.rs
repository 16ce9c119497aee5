//! Email format validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

const MAX_EMAIL_LEN: usize = 254;

/// Checks the shape of an email address: one `@`, a plain local part, and a
/// dotted domain whose last label is alphabetic
#[derive(Debug, Clone, Default)]
pub struct EmailValidator {
    pub message: Option<String>,
}

impl EmailValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn is_valid(email: &str) -> bool {
        if email.len() > MAX_EMAIL_LEN {
            return false;
        }
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };

        let local_ok = !local.is_empty()
            && !local.starts_with('.')
            && !local.ends_with('.')
            && !local.contains("..")
            && local
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));

        let labels: Vec<&str> = domain.split('.').collect();
        let labels_ok = labels.len() >= 2
            && labels.iter().all(|label| {
                !label.is_empty()
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });
        let tld_ok = labels
            .last()
            .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

        local_ok && labels_ok && tld_ok
    }
}

#[async_trait]
impl ValidationRule for EmailValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::String(email) if Self::is_valid(email) => Ok(()),
            _ => {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} must be a valid email address", field));
                Err(ValidationError::with_code(field, message, "invalid_email").into())
            }
        }
    }

    fn rule_name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_valid_addresses() {
        let validator = EmailValidator::new();
        for email in ["a@example.com", "first.last+tag@mail.example.org", "x_y%z@sub-domain.io"] {
            assert!(validator.validate(&json!(email), "email").await.is_ok(), "{}", email);
        }
    }

    #[tokio::test]
    async fn test_invalid_addresses() {
        let validator = EmailValidator::new();
        for email in [
            "plain",
            "@example.com",
            "a@@example.com",
            "a@example",
            "a..b@example.com",
            "a@-example.com",
            "a@example.c0m",
            "a b@example.com",
        ] {
            assert!(validator.validate(&json!(email), "email").await.is_err(), "{}", email);
        }
        assert!(validator.validate(&json!(42), "email").await.is_err());
    }
}
