//! Routine call descriptions
//!
//! A [`ProcedureCall`] fully describes one unit of database work: which
//! routine to invoke, the named parameters to bind, and the shape the caller
//! expects back. Nothing here touches the network.

use crate::error::{GatewayError, GatewayResult};
use crate::value::DatabaseValue;
use std::collections::HashSet;
use std::fmt;

/// PostgreSQL truncates identifiers beyond this length
const MAX_IDENTIFIER_LEN: usize = 63;

/// The result shape the caller expects from a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultShape {
    /// First record of the first result set
    #[default]
    Single,
    /// Every result set, optionally labeled
    Multi,
    /// No payload
    None,
}

/// Ordered, named parameters for a routine call
#[derive(Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, DatabaseValue)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Uniqueness is checked when the call is validated.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn validate(&self) -> GatewayResult<()> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for (name, _) in &self.entries {
            validate_identifier(name, "parameter name")?;
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(GatewayError::invalid_call(format!(
                    "parameter '{}' is bound more than once",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<DatabaseValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Parameters::new();
        for (name, value) in iter {
            parameters.push(name, value);
        }
        parameters
    }
}

// Values may hold credentials or personal data; only names and types print.
impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|(name, value)| (name, format!("<{}>", value.type_name()))),
            )
            .finish()
    }
}

/// A complete description of one routine invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    routine: String,
    parameters: Parameters,
    shape: ResultShape,
    labels: Option<Vec<String>>,
}

impl ProcedureCall {
    /// Call `routine` expecting a single record back
    pub fn new(routine: impl Into<String>) -> Self {
        Self {
            routine: routine.into(),
            parameters: Parameters::new(),
            shape: ResultShape::Single,
            labels: None,
        }
    }

    /// Call `routine` expecting no payload
    pub fn command(routine: impl Into<String>) -> Self {
        Self::new(routine).expect(ResultShape::None)
    }

    /// Call `routine` expecting several result sets
    pub fn multi(routine: impl Into<String>) -> Self {
        Self::new(routine).expect(ResultShape::Multi)
    }

    pub fn expect(mut self, shape: ResultShape) -> Self {
        self.shape = shape;
        self
    }

    /// Bind one named parameter
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.parameters.push(name, value);
        self
    }

    /// Bind every parameter of an existing set, after those already bound
    pub fn bind_all(mut self, parameters: Parameters) -> Self {
        self.parameters.entries.extend(parameters.entries);
        self
    }

    /// Label the result sets positionally; implies [`ResultShape::Multi`]
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self.shape = ResultShape::Multi;
        self
    }

    pub fn routine(&self) -> &str {
        &self.routine
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }

    pub fn result_labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Check the call before any I/O: identifiers, unique parameter names,
    /// and labels only on multi-set calls.
    pub fn validate(&self) -> GatewayResult<()> {
        validate_routine_name(&self.routine)?;
        self.parameters.validate()?;

        if let Some(labels) = &self.labels {
            if self.shape != ResultShape::Multi {
                return Err(GatewayError::invalid_call(format!(
                    "labels given for routine '{}' but the expected shape is {:?}",
                    self.routine, self.shape
                )));
            }
            let mut seen = HashSet::with_capacity(labels.len());
            for label in labels {
                if label.is_empty() || !seen.insert(label.as_str()) {
                    return Err(GatewayError::invalid_call(format!(
                        "result label '{}' is empty or repeated",
                        label
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A routine name is one identifier or `schema.identifier`
fn validate_routine_name(name: &str) -> GatewayResult<()> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 {
        return Err(GatewayError::invalid_call(format!(
            "routine name '{}' has more than one schema qualifier",
            name
        )));
    }
    for segment in segments {
        validate_identifier(segment, "routine name")?;
    }
    Ok(())
}

fn validate_identifier(identifier: &str, what: &str) -> GatewayResult<()> {
    let mut chars = identifier.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(GatewayError::invalid_call(format!(
            "{} '{}' is not a plain identifier",
            what, identifier
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_call() {
        let call = ProcedureCall::new("accounts.get_account")
            .bind("account_id", 5)
            .bind("include_closed", false);
        assert!(call.validate().is_ok());
        assert_eq!(call.parameters().names(), vec!["account_id", "include_closed"]);
    }

    #[test]
    fn test_duplicate_parameter_names_rejected() {
        let call = ProcedureCall::new("get_account")
            .bind("id", 1)
            .bind("ID", 2);
        assert!(matches!(call.validate(), Err(GatewayError::InvalidCall { .. })));
    }

    #[test]
    fn test_injection_shaped_names_rejected() {
        for name in ["get_user; drop table users", "a.b.c", "1abc", "", "get-user"] {
            let call = ProcedureCall::new(name);
            assert!(
                matches!(call.validate(), Err(GatewayError::InvalidCall { .. })),
                "{} should be rejected",
                name
            );
        }

        let call = ProcedureCall::new("get_user").bind("id) OR (1=1", 1);
        assert!(call.validate().is_err());
    }

    #[test]
    fn test_labels_imply_multi_and_must_be_unique() {
        let call = ProcedureCall::new("dashboard").labels(["summary", "items"]);
        assert_eq!(call.shape(), ResultShape::Multi);
        assert!(call.validate().is_ok());

        let call = ProcedureCall::new("dashboard").labels(["items", "items"]);
        assert!(call.validate().is_err());

        let call = ProcedureCall::new("dashboard")
            .labels(["items"])
            .expect(ResultShape::Single);
        assert!(call.validate().is_err());
    }

    #[test]
    fn test_debug_output_redacts_values() {
        let call = ProcedureCall::new("login").bind("password", "hunter2");
        let printed = format!("{:?}", call);
        assert!(printed.contains("password"));
        assert!(printed.contains("<text>"));
        assert!(!printed.contains("hunter2"));
    }
}
