//! Declarative input schemas with type coercion
//!
//! A [`Schema`] lists the fields an operation accepts. Validation walks the
//! declared fields (not the input), so a missing required field is always
//! reported. Each present value is coerced to its declared [`FieldType`]
//! before the field's rules run: a query string `"5"` becomes the integer
//! `5` for an [`FieldType::Integer`] field.

use crate::error::{ValidationError, ValidationErrors, ValidationResult};
use crate::traits::{InputSchema, ValidationRule};
use crate::validators::required::{is_blank, RequiredValidator};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::{json, Map, Number, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The type a field's value is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Canonical hyphenated text
    Uuid,
    /// RFC 3339, normalized to UTC
    DateTime,
    /// `YYYY-MM-DD`
    Date,
    /// Any JSON value, passed through
    Json,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Uuid => "uuid",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::Json => "json",
        }
    }

    /// Coerce a non-null value to this type
    pub fn coerce(&self, field: &str, value: Value) -> Result<Value, ValidationError> {
        let coerced = match (self, value) {
            (FieldType::Json, value) => Some(value),

            (FieldType::String, Value::String(s)) => Some(Value::String(s)),
            (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (FieldType::Integer, Value::Number(n)) => integer_from_number(&n),
            (FieldType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (FieldType::Number, Value::Number(n)) => Some(Value::Number(n)),
            (FieldType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),

            (FieldType::Boolean, Value::Bool(b)) => Some(Value::Bool(b)),
            (FieldType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                _ => None,
            },

            (FieldType::Uuid, Value::String(s)) => Uuid::parse_str(s.trim())
                .ok()
                .map(|u| Value::String(u.to_string())),
            (FieldType::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| Value::String(dt.with_timezone(&chrono::Utc).to_rfc3339())),
            (FieldType::Date, Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .map(|d| Value::String(d.to_string())),

            _ => None,
        };

        coerced.ok_or_else(|| {
            ValidationError::with_code(
                field,
                format!("{} must be a valid {}", field, self.name()),
                "invalid_type",
            )
            .context(json!({"expected": self.name()}))
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn integer_from_number(n: &Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::from(i));
    }
    // 5.0 is accepted as 5; 5.5 is not an integer
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
        .map(|f| Value::from(f as i64))
}

/// One declared field
#[derive(Clone)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
    /// Used when the field is absent or null
    pub default: Option<Value>,
    rules: Vec<Arc<dyn ValidationRule>>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn uuid() -> Self {
        Self::new(FieldType::Uuid)
    }

    pub fn datetime() -> Self {
        Self::new(FieldType::DateTime)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn json() -> Self {
        Self::new(FieldType::Json)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Add a rule, run after coercion
    pub fn rule<R>(mut self, rule: R) -> Self
    where
        R: ValidationRule + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.rule_name()).collect()
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("field_type", &self.field_type)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// What happens to input keys the schema does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Dropped from the accepted mapping
    #[default]
    Strip,
    /// Passed through unchanged
    Allow,
    /// Reported as violations
    Reject,
}

type CrossFieldCheck = dyn Fn(&Map<String, Value>) -> Result<(), ValidationError> + Send + Sync;

/// A set of declared fields plus cross-field checks
#[derive(Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSchema)>,
    unknown: UnknownFields,
    checks: Vec<Arc<CrossFieldCheck>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Declaring the same name again replaces it.
    pub fn field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown = policy;
        self
    }

    /// Add a check over the coerced mapping. Checks run only when every
    /// field passed on its own.
    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, field)| field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    async fn validate_field(
        &self,
        name: &str,
        field: &FieldSchema,
        raw: Option<Value>,
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        let value = match raw {
            Some(value) if !value.is_null() => value,
            raw => match (&field.default, field.required) {
                (Some(default), _) => default.clone(),
                (None, true) => {
                    errors.add(RequiredValidator::new().violation(name));
                    return None;
                }
                // An explicit null for an optional field is kept
                (None, false) => return raw,
            },
        };

        if field.required && is_blank(&value) {
            errors.add(RequiredValidator::new().violation(name));
            return None;
        }

        let value = match field.field_type.coerce(name, value) {
            Ok(value) => value,
            Err(error) => {
                errors.add(error);
                return None;
            }
        };

        let before = errors.len();
        for rule in &field.rules {
            if let Err(violations) = rule.validate(&value, name).await {
                errors.merge(violations);
            }
        }
        (errors.len() == before).then_some(value)
    }
}

#[async_trait]
impl InputSchema for Schema {
    async fn validate(&self, mut input: Map<String, Value>) -> ValidationResult<Map<String, Value>> {
        let mut errors = ValidationErrors::new();
        let mut accepted = Map::new();

        for (name, field) in &self.fields {
            let raw = input.remove(name);
            if let Some(value) = self.validate_field(name, field, raw, &mut errors).await {
                accepted.insert(name.clone(), value);
            }
        }

        match self.unknown {
            UnknownFields::Strip => {}
            UnknownFields::Allow => accepted.extend(input),
            UnknownFields::Reject => {
                for key in input.keys() {
                    errors.add(ValidationError::with_code(
                        key.as_str(),
                        format!("{} is not an accepted field", key),
                        "unknown_field",
                    ));
                }
            }
        }

        if errors.is_empty() {
            for check in &self.checks {
                if let Err(error) = check(&accepted) {
                    errors.add(error);
                }
            }
        }

        errors.into_result(accepted)
    }

    fn field_type(&self, field: &str) -> Option<FieldType> {
        self.get_field(field).map(|f| f.field_type)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("unknown", &self.unknown)
            .field("checks", &self.checks.len())
            .finish()
    }
}
