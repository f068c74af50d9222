//! Update maps: dotted path -> plain value or [`Action`]

use std::collections::BTreeMap;

use serde_json::Value;

use super::action::{Action, ActionKind};

/// Right-hand side of an update entry
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    /// Replace the field with this value
    Set(Value),
    /// Apply an atomic action
    Action(Action),
}

impl UpdateValue {
    pub fn kind(&self) -> ActionKind {
        match self {
            UpdateValue::Set(_) => ActionKind::Set,
            UpdateValue::Action(action) => action.kind(),
        }
    }
}

impl From<Action> for UpdateValue {
    fn from(action: Action) -> Self {
        UpdateValue::Action(action)
    }
}

impl From<Value> for UpdateValue {
    fn from(value: Value) -> Self {
        UpdateValue::Set(value)
    }
}

/// Caller-built update map, keyed by dotted field path.
///
/// Entry order is irrelevant to the store; a later entry for the same path
/// replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Updates {
    entries: BTreeMap<String, UpdateValue>,
}

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add any entry
    pub fn with(mut self, path: impl Into<String>, value: impl Into<UpdateValue>) -> Self {
        self.entries.insert(path.into(), value.into());
        self
    }

    /// Replace a field with a plain value
    pub fn set(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, UpdateValue::Set(value.into()))
    }

    /// Apply an action to a field
    pub fn apply(self, path: impl Into<String>, action: Action) -> Self {
        self.with(path, UpdateValue::Action(action))
    }

    pub fn get(&self, path: &str) -> Option<&UpdateValue> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &UpdateValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Updates {
    type Item = (String, UpdateValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, UpdateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, UpdateValue)> for Updates {
    fn from_iter<I: IntoIterator<Item = (String, UpdateValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
