//! Request and response shapes exchanged with the store

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use crate::update::Delta;

/// Maximum number of records a single `put_many` call accepts
pub const MAX_BATCH_SIZE: usize = 25;

/// Store-native atomic mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationToken {
    Increment(Delta),
    Append(Vec<Value>),
    Prepend(Vec<Value>),
    Trim,
}

/// One entry of a translated update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEntry {
    Set(Value),
    Mutation(MutationToken),
}

/// Translated update map handed verbatim to [`Store::update`](super::Store::update)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    pub entries: BTreeMap<String, UpdateEntry>,
}

impl UpdateRequest {
    /// Render the HTTP update body: one section per operation kind.
    pub fn to_wire(&self) -> Value {
        let mut set = Map::new();
        let mut increment = Map::new();
        let mut append = Map::new();
        let mut prepend = Map::new();
        let mut delete = Vec::new();

        for (path, entry) in &self.entries {
            match entry {
                UpdateEntry::Set(value) => {
                    set.insert(path.clone(), value.clone());
                }
                UpdateEntry::Mutation(MutationToken::Increment(delta)) => {
                    increment.insert(path.clone(), delta.to_value());
                }
                UpdateEntry::Mutation(MutationToken::Append(values)) => {
                    append.insert(path.clone(), Value::Array(values.clone()));
                }
                UpdateEntry::Mutation(MutationToken::Prepend(values)) => {
                    prepend.insert(path.clone(), Value::Array(values.clone()));
                }
                UpdateEntry::Mutation(MutationToken::Trim) => {
                    delete.push(Value::String(path.clone()));
                }
            }
        }

        serde_json::json!({
            "set": set,
            "increment": increment,
            "append": append,
            "prepend": prepend,
            "delete": delete,
        })
    }
}

impl FromIterator<(String, UpdateEntry)> for UpdateRequest {
    fn from_iter<I: IntoIterator<Item = (String, UpdateEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Expiry options shared by every write call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Seconds from now until the record expires
    pub expire_in: Option<u64>,
    /// Absolute expiry time
    pub expire_at: Option<DateTime<Utc>>,
}

impl WriteOptions {
    pub fn expire_in(seconds: u64) -> Self {
        Self {
            expire_in: Some(seconds),
            ..Default::default()
        }
    }

    pub fn expire_at(at: DateTime<Utc>) -> Self {
        Self {
            expire_at: Some(at),
            ..Default::default()
        }
    }

    /// Resolve to a unix timestamp (seconds); both options at once is an error
    pub fn expires(&self, now: DateTime<Utc>) -> StoreResult<Option<i64>> {
        match (self.expire_in, self.expire_at) {
            (Some(_), Some(_)) => Err(StoreError::rejected(
                "can't set both expire_in and expire_at options",
            )),
            (Some(secs), None) => {
                let secs = i64::try_from(secs)
                    .map_err(|_| StoreError::rejected("expire_in is out of range"))?;
                Ok(Some(now.timestamp().saturating_add(secs)))
            }
            (None, Some(at)) => Ok(Some(at.timestamp())),
            (None, None) => Ok(None),
        }
    }
}

/// Options for one physical fetch call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum items to return; `None` lets the store pick its page size
    pub limit: Option<usize>,
    /// Continuation cursor from a previous page
    pub last: Option<String>,
    /// Descending key order
    pub desc: bool,
}

/// One page of fetch results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Value>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

/// Records accepted by a `put_many` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Processed {
    pub items: Vec<Value>,
}

/// Result of a `put_many` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutManyOutcome {
    pub processed: Processed,
}
