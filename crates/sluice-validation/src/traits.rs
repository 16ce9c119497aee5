//! Core validation traits

use crate::error::ValidationResult;
use crate::schema::FieldType;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A rule applied to a single, already coerced field value
#[async_trait]
pub trait ValidationRule: Send + Sync {
    /// Validate a single value
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()>;

    /// Get the validation rule name/type
    fn rule_name(&self) -> &'static str;

    /// Get validation rule parameters/configuration as JSON
    fn parameters(&self) -> Option<Value> {
        None
    }
}

/// Validates and coerces a whole input mapping.
///
/// On success returns the accepted mapping, with values coerced to their
/// declared types; on failure returns every violation found.
#[async_trait]
pub trait InputSchema: Send + Sync {
    async fn validate(&self, input: Map<String, Value>) -> ValidationResult<Map<String, Value>>;

    /// Declared type of a field, when the schema knows it
    fn field_type(&self, _field: &str) -> Option<FieldType> {
        None
    }
}
