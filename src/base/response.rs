//! Typed results of base operations

use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BaseError, BaseResult};

/// A stored record with its key and optional expiry.
///
/// Only ever produced from store responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord<T> {
    pub key: String,
    /// Expiry as unix seconds
    #[serde(rename = "__expires", default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(flatten)]
    pub record: T,
}

impl<T> OutputRecord<T> {
    pub fn into_inner(self) -> T {
        self.record
    }
}

impl<T> Deref for OutputRecord<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> BaseResult<OutputRecord<T>> {
    serde_json::from_value(value).map_err(BaseError::Decode)
}

pub(crate) fn decode_all<T: DeserializeOwned>(values: Vec<Value>) -> BaseResult<Vec<OutputRecord<T>>> {
    values.into_iter().map(decode).collect()
}

/// Result of a fetch; `count == items.len()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse<T> {
    pub items: Vec<OutputRecord<T>>,
    pub count: usize,
    /// Cursor after the last page fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedItems<T> {
    pub items: Vec<OutputRecord<T>>,
}

/// Result of a single put_many call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutManyResponse<T> {
    pub processed: ProcessedItems<T>,
}

/// Outcome of one chunk of a chunked put_many
#[derive(Debug)]
pub struct ChunkOutcome<T> {
    /// Position of the chunk in the batch
    pub index: usize,
    /// Offset of the chunk's first record in the batch
    pub offset: usize,
    pub size: usize,
    pub result: BaseResult<Vec<OutputRecord<T>>>,
}

impl<T> ChunkOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-chunk results of a chunked put_many, in chunk order
#[derive(Debug)]
pub struct ChunkedPutManyResponse<T> {
    pub chunks: Vec<ChunkOutcome<T>>,
}

impl<T> ChunkedPutManyResponse<T> {
    /// Every chunk was stored
    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(ChunkOutcome::is_ok)
    }

    /// Records stored by the successful chunks
    pub fn items(&self) -> impl Iterator<Item = &OutputRecord<T>> {
        self.chunks
            .iter()
            .filter_map(|c| c.result.as_ref().ok())
            .flatten()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChunkOutcome<T>> {
        self.chunks.iter().filter(|c| !c.is_ok())
    }

    /// Collapse into one response, failing with the first chunk error
    pub fn into_result(self) -> BaseResult<PutManyResponse<T>> {
        let mut items = Vec::new();
        for chunk in self.chunks {
            items.extend(chunk.result?);
        }
        Ok(PutManyResponse {
            processed: ProcessedItems { items },
        })
    }
}
