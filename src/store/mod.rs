//! # Store Collaborator
//!
//! The remote key-value store a Base talks to. The façade never talks to a
//! transport directly; it only uses the primitives of [`Store`]. Records
//! cross this boundary as JSON values.
//!
//! [`MemoryStore`] is an in-process implementation honoring the same
//! contracts, used by tests and local development.

mod errors;
mod memory;
mod request;

pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryStore, StoreCalls, DEFAULT_PAGE_SIZE};
pub use request::{
    MutationToken, Page, PageRequest, Processed, PutManyOutcome, UpdateEntry, UpdateRequest,
    WriteOptions, MAX_BATCH_SIZE,
};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::query::Query;
use crate::update::Delta;

/// Boxed future returned by store primitives
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Primitives exposed by the store collaborator
pub trait Store: Send + Sync {
    /// Store a record, replacing any record under the same key.
    /// Generates a key when none is given.
    fn put(
        &self,
        record: Value,
        key: Option<String>,
        options: WriteOptions,
    ) -> StoreFuture<'_, Option<Value>>;

    /// Retrieve a record by key
    fn get(&self, key: String) -> StoreFuture<'_, Option<Value>>;

    /// Store a record; fails with [`StoreError::Conflict`] if the key exists
    fn insert(
        &self,
        record: Value,
        key: Option<String>,
        options: WriteOptions,
    ) -> StoreFuture<'_, Value>;

    /// Store up to [`MAX_BATCH_SIZE`] records in one call
    fn put_many(&self, records: Vec<Value>, options: WriteOptions)
        -> StoreFuture<'_, PutManyOutcome>;

    /// Apply a translated update to an existing record
    fn update(
        &self,
        updates: UpdateRequest,
        key: String,
        options: WriteOptions,
    ) -> StoreFuture<'_, ()>;

    /// Delete a record; absent keys are not an error
    fn delete(&self, key: String) -> StoreFuture<'_, ()>;

    /// Fetch one page of records matching the query
    fn fetch(&self, query: Option<Query>, request: PageRequest) -> StoreFuture<'_, Page>;

    /// Mutation token adding `delta` to a number
    fn make_increment(&self, delta: Delta) -> MutationToken {
        MutationToken::Increment(delta)
    }

    /// Mutation token appending an element or a sequence of elements
    fn make_append(&self, value: Value) -> MutationToken {
        MutationToken::Append(into_elements(value))
    }

    /// Mutation token prepending an element or a sequence of elements
    fn make_prepend(&self, value: Value) -> MutationToken {
        MutationToken::Prepend(into_elements(value))
    }

    /// Mutation token removing a field
    fn make_trim(&self) -> MutationToken {
        MutationToken::Trim
    }
}

/// A sequence operand contributes its elements; anything else is one element
fn into_elements(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn put(
        &self,
        record: Value,
        key: Option<String>,
        options: WriteOptions,
    ) -> StoreFuture<'_, Option<Value>> {
        (**self).put(record, key, options)
    }

    fn get(&self, key: String) -> StoreFuture<'_, Option<Value>> {
        (**self).get(key)
    }

    fn insert(
        &self,
        record: Value,
        key: Option<String>,
        options: WriteOptions,
    ) -> StoreFuture<'_, Value> {
        (**self).insert(record, key, options)
    }

    fn put_many(
        &self,
        records: Vec<Value>,
        options: WriteOptions,
    ) -> StoreFuture<'_, PutManyOutcome> {
        (**self).put_many(records, options)
    }

    fn update(
        &self,
        updates: UpdateRequest,
        key: String,
        options: WriteOptions,
    ) -> StoreFuture<'_, ()> {
        (**self).update(updates, key, options)
    }

    fn delete(&self, key: String) -> StoreFuture<'_, ()> {
        (**self).delete(key)
    }

    fn fetch(&self, query: Option<Query>, request: PageRequest) -> StoreFuture<'_, Page> {
        (**self).fetch(query, request)
    }

    fn make_increment(&self, delta: Delta) -> MutationToken {
        (**self).make_increment(delta)
    }

    fn make_append(&self, value: Value) -> MutationToken {
        (**self).make_append(value)
    }

    fn make_prepend(&self, value: Value) -> MutationToken {
        (**self).make_prepend(value)
    }

    fn make_trim(&self) -> MutationToken {
        (**self).make_trim()
    }
}
