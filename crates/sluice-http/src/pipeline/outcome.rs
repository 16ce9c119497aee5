//! Pipeline outcomes

use crate::errors::HttpError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sluice_auth::{AuthContext, AuthError};
use sluice_gateway::{DatabaseValue, Parameters};
use sluice_validation::{FieldType, ValidationErrors};
use std::collections::HashMap;
use uuid::Uuid;

/// Why a request was turned away
#[derive(Debug, Clone)]
pub enum Rejection {
    Invalid(ValidationErrors),
    Denied(AuthError),
}

impl From<Rejection> for HttpError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Invalid(errors) => HttpError::Validation(errors),
            Rejection::Denied(err) => err.into(),
        }
    }
}

/// The result of running a request through a [`CrudController`](super::CrudController)
#[derive(Debug)]
pub enum ValidationOutcome {
    Accepted { auth: AuthContext, params: ValidatedParams },
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted { .. })
    }

    /// Convert into a `Result`, ready for `?` in a handler
    pub fn into_result(self) -> Result<(AuthContext, ValidatedParams), Rejection> {
        match self {
            ValidationOutcome::Accepted { auth, params } => Ok((auth, params)),
            ValidationOutcome::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Input that passed the schema: coerced values plus the declared type of
/// each field the schema knows.
#[derive(Debug, Clone, Default)]
pub struct ValidatedParams {
    values: Map<String, Value>,
    types: HashMap<String, FieldType>,
}

impl ValidatedParams {
    pub fn new(values: Map<String, Value>, types: HashMap<String, FieldType>) -> Self {
        Self { values, types }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// Deserialize into a typed record
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.values.clone()))
    }

    /// Gateway parameters. Fields declared as uuid, datetime, date or json
    /// bind with their database type; everything else goes through
    /// [`DatabaseValue::from_json`].
    pub fn into_parameters(self) -> Parameters {
        let types = self.types;
        self.values
            .into_iter()
            .map(|(name, value)| {
                let value = database_value(types.get(&name).copied(), value);
                (name, value)
            })
            .collect()
    }
}

fn database_value(field_type: Option<FieldType>, value: Value) -> DatabaseValue {
    let typed = match (field_type, &value) {
        (_, Value::Null) => None,
        (Some(FieldType::Uuid), Value::String(s)) => Uuid::parse_str(s).ok().map(DatabaseValue::Uuid),
        (Some(FieldType::DateTime), Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| DatabaseValue::DateTime(dt.with_timezone(&Utc))),
        (Some(FieldType::Date), Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(DatabaseValue::Date),
        (Some(FieldType::Json), _) => Some(DatabaseValue::Json(value.clone())),
        _ => None,
    };
    typed.unwrap_or_else(|| DatabaseValue::from_json(value))
}
