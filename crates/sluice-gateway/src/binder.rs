//! Parameter binding
//!
//! Turns a validated [`ProcedureCall`] into the driver-facing [`BoundCall`]:
//! an ordered argument list where every value travels as a bound parameter
//! and is addressed by position. Caller data never becomes statement text.

use crate::call::{ProcedureCall, ResultShape};
use crate::error::GatewayResult;
use crate::value::DatabaseValue;

/// One bound argument: the routine's parameter name and the value that
/// occupies placeholder `position` (1-based)
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgument {
    pub name: String,
    pub position: usize,
    pub value: DatabaseValue,
}

/// A routine invocation ready for a backend
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCall {
    pub routine: String,
    pub shape: ResultShape,
    pub arguments: Vec<BoundArgument>,
}

impl BoundCall {
    /// Parameter names in binding order
    pub fn parameter_names(&self) -> Vec<String> {
        self.arguments.iter().map(|arg| arg.name.clone()).collect()
    }

    /// Values in placeholder order
    pub fn values(&self) -> impl Iterator<Item = &DatabaseValue> {
        self.arguments.iter().map(|arg| &arg.value)
    }
}

/// Maps a named parameter set onto positional placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    pub fn new() -> Self {
        Self
    }

    /// Validate `call` and produce its bound form
    pub fn bind(&self, call: &ProcedureCall) -> GatewayResult<BoundCall> {
        call.validate()?;

        let arguments = call
            .parameters()
            .iter()
            .enumerate()
            .map(|(index, (name, value))| BoundArgument {
                name: name.to_string(),
                position: index + 1,
                value: value.clone(),
            })
            .collect();

        Ok(BoundCall {
            routine: call.routine().to_string(),
            shape: call.shape(),
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn test_positions_follow_binding_order() {
        let call = ProcedureCall::new("orders.place")
            .bind("customer_id", 9)
            .bind("sku", "A-1")
            .bind("quantity", 3);
        let bound = ParameterBinder::new().bind(&call).unwrap();

        assert_eq!(bound.routine, "orders.place");
        assert_eq!(bound.parameter_names(), vec!["customer_id", "sku", "quantity"]);
        let positions: Vec<usize> = bound.arguments.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(bound.arguments[1].value, DatabaseValue::String("A-1".to_string()));
    }

    #[test]
    fn test_bind_rejects_invalid_call() {
        let call = ProcedureCall::new("bad name");
        assert!(matches!(
            ParameterBinder::new().bind(&call),
            Err(GatewayError::InvalidCall { .. })
        ));
    }
}
