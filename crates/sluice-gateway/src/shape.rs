//! Result shaping
//!
//! Reshapes a [`RawResult`] into the form the caller declared on the call.

use crate::call::ResultShape;
use crate::record::{RawResult, Record, RecordSet};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Result sets keyed by caller-supplied labels, in label order.
///
/// A label whose position is past the last returned set maps to nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledSets {
    entries: Vec<(String, Option<RecordSet>)>,
}

impl LabeledSets {
    /// The set at the label's position, if the routine returned one
    pub fn get(&self, label: &str) -> Option<&RecordSet> {
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .and_then(|(_, set)| set.as_ref())
    }

    /// Remove and return a labeled set
    pub fn take(&mut self, label: &str) -> Option<RecordSet> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == label)
            .and_then(|(_, set)| set.take())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of labels that received a set
    pub fn filled(&self) -> usize {
        self.entries.iter().filter(|(_, set)| set.is_some()).count()
    }
}

impl Serialize for LabeledSets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, set) in &self.entries {
            map.serialize_entry(label, set)?;
        }
        map.end()
    }
}

/// The shaped outcome of a routine call
#[derive(Debug, Clone, PartialEq)]
pub enum RoutineOutput {
    /// First record of the first set; `None` when nothing came back
    Single(Option<Record>),
    /// Sets mapped to labels
    Labeled(LabeledSets),
    /// All sets, unlabeled, in order
    Sets(Vec<RecordSet>),
    /// The caller asked for no payload
    Empty,
}

impl RoutineOutput {
    pub fn into_single(self) -> Option<Record> {
        match self {
            RoutineOutput::Single(record) => record,
            _ => None,
        }
    }

    pub fn into_labeled(self) -> Option<LabeledSets> {
        match self {
            RoutineOutput::Labeled(sets) => Some(sets),
            _ => None,
        }
    }

    pub fn into_sets(self) -> Option<Vec<RecordSet>> {
        match self {
            RoutineOutput::Sets(sets) => Some(sets),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RoutineOutput::Empty | RoutineOutput::Single(None))
    }
}

impl Serialize for RoutineOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RoutineOutput::Single(record) => record.serialize(serializer),
            RoutineOutput::Labeled(sets) => sets.serialize(serializer),
            RoutineOutput::Sets(sets) => sets.serialize(serializer),
            RoutineOutput::Empty => serializer.serialize_unit(),
        }
    }
}

/// Reshape `raw` according to the declared shape and labels
pub fn shape_result(raw: RawResult, shape: ResultShape, labels: Option<&[String]>) -> RoutineOutput {
    match shape {
        ResultShape::Single => RoutineOutput::Single(
            raw.record_sets
                .into_iter()
                .next()
                .and_then(|set| set.into_iter().next()),
        ),
        ResultShape::Multi => match labels {
            Some(labels) => {
                let mut sets = raw.record_sets.into_iter();
                let entries = labels
                    .iter()
                    .map(|label| (label.clone(), sets.next()))
                    .collect();
                RoutineOutput::Labeled(LabeledSets { entries })
            }
            None => RoutineOutput::Sets(raw.record_sets),
        },
        ResultShape::None => RoutineOutput::Empty,
    }
}
