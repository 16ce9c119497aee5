//! Records returned by routines

use crate::value::DatabaseValue;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;

/// One row of a result set, with columns in the order the routine produced them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, DatabaseValue)>,
}

/// Ordered rows of one result set
pub type RecordSet = Vec<Record>;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a column. A repeated column name replaces the earlier value.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) {
        let name = name.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Get a column value by name
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Get a column value by position
    pub fn get_by_index(&self, index: usize) -> Option<&DatabaseValue> {
        self.columns.get(index).map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert row to a JSON object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.columns
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Deserialize the row into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

/// Everything a routine invocation returned, before shaping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub record_sets: Vec<RecordSet>,
}

impl RawResult {
    pub fn new(record_sets: Vec<RecordSet>) -> Self {
        Self { record_sets }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
