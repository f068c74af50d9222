//! In-memory store
//!
//! Honors the collaborator contracts: generated 12-character keys, expiry
//! markers, conflict on insert, the batch cap, atomic mutation tokens and
//! scan-budgeted pagination with continuation cursors. A page scans at most
//! `page_size` stored records, so a sparse query can return an empty page
//! that still carries a cursor.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::request::{
    MutationToken, Page, PageRequest, Processed, PutManyOutcome, UpdateEntry, UpdateRequest,
    WriteOptions, MAX_BATCH_SIZE,
};
use super::{Store, StoreFuture};
use crate::query::Query;
use crate::schema::{EXPIRES_FIELD, KEY_FIELD};

/// Records scanned per fetch call unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const KEY_LENGTH: usize = 12;

#[derive(Debug, Default)]
struct CallCounters {
    put: AtomicUsize,
    get: AtomicUsize,
    insert: AtomicUsize,
    put_many: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    fetch: AtomicUsize,
}

/// Number of calls received per primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub put: usize,
    pub get: usize,
    pub insert: usize,
    pub put_many: usize,
    pub update: usize,
    pub delete: usize,
    pub fetch: usize,
}

impl StoreCalls {
    /// Calls that write records
    pub fn writes(&self) -> usize {
        self.put + self.insert + self.put_many + self.update + self.delete
    }

    /// Every call
    pub fn total(&self) -> usize {
        self.writes() + self.get + self.fetch
    }
}

/// In-memory store for testing and local development
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Value>>,
    page_size: usize,
    calls: CallCounters,
    // 1-based index of the fetch call that fails; 0 disables
    fail_fetch_at: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Store scanning at most `page_size` records per fetch call
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            calls: CallCounters::default(),
            fail_fetch_at: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Delay every call by `latency`, standing in for a network round trip
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Make the `call`-th fetch (1-based, counted from construction) fail
    /// with a remote error.
    pub fn fail_fetch_on_call(&self, call: usize) {
        self.fail_fetch_at.store(call, Ordering::SeqCst);
    }

    /// Snapshot of the call counters
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            put: self.calls.put.load(Ordering::SeqCst),
            get: self.calls.get.load(Ordering::SeqCst),
            insert: self.calls.insert.load(Ordering::SeqCst),
            put_many: self.calls.put_many.load(Ordering::SeqCst),
            update: self.calls.update.load(Ordering::SeqCst),
            delete: self.calls.delete.load(Ordering::SeqCst),
            fetch: self.calls.fetch.load(Ordering::SeqCst),
        }
    }

    /// Number of stored records, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn read_records(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, Value>>> {
        self.records
            .read()
            .map_err(|_| StoreError::remote("store lock poisoned"))
    }

    fn write_records(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Value>>> {
        self.records
            .write()
            .map_err(|_| StoreError::remote("store lock poisoned"))
    }

    fn scan(&self, query: Option<&Query>, request: &PageRequest) -> StoreResult<Page> {
        let limit = request.limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return Ok(Page::default());
        }

        let records = self.read_records()?;
        let now = Utc::now().timestamp();

        let iter: Box<dyn Iterator<Item = (&String, &Value)> + '_> =
            match (&request.last, request.desc) {
                (None, false) => Box::new(records.iter()),
                (None, true) => Box::new(records.iter().rev()),
                (Some(last), false) => Box::new(
                    records.range::<String, _>((Bound::Excluded(last.clone()), Bound::Unbounded)),
                ),
                (Some(last), true) => Box::new(
                    records
                        .range::<String, _>((Bound::Unbounded, Bound::Excluded(last.clone())))
                        .rev(),
                ),
            };
        let mut iter = iter.peekable();

        let mut items = Vec::new();
        let mut last_key = None;
        let mut scanned = 0;

        while let Some((key, record)) = iter.next() {
            scanned += 1;
            if is_live(record, now) && query.map_or(true, |q| q.matches(record)) {
                items.push(record.clone());
            }
            last_key = Some(key.clone());
            if items.len() >= limit || scanned >= self.page_size {
                break;
            }
        }

        let last = if iter.peek().is_some() { last_key } else { None };
        Ok(Page {
            count: items.len(),
            items,
            last,
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn put(
        &self,
        record: Value,
        key: Option<String>,
        options: WriteOptions,
    ) -> StoreFuture<'_, Option<Value>> {
        Box::pin(async move {
            self.calls.put.fetch_add(1, Ordering::SeqCst);
            self.round_trip().await;
            let (key, stored) = prepare(record, key, &options, Utc::now())?;
            self.write_records()?.insert(key, stored.clone());
            Ok(Some(stored))
        })
    }

    fn get(&self, key: String) -> StoreFuture<'_, Option<Value>> {
        Box::pin(async move {
            self.calls.get.fetch_add(1, Ordering::SeqCst);
            self.round_trip().await;
            let now = Utc::now().timestamp();
            Ok(self
                .read_records()?
                .get(&key)
                .filter(|record| is_live(record, now))
                .cloned())
        })
    }

    fn insert(
        &self,
        record: Value,
        key: Option<String>,
        options: WriteOptions,
    ) -> StoreFuture<'_, Value> {
        Box::pin(async move {
            self.calls.insert.fetch_add(1, Ordering::SeqCst);
            self.round_trip().await;
            let now = Utc::now();
            let (key, stored) = prepare(record, key, &options, now)?;

            let mut records = self.write_records()?;
            if records
                .get(&key)
                .map_or(false, |existing| is_live(existing, now.timestamp()))
            {
                return Err(StoreError::Conflict(key));
            }
            records.insert(key, stored.clone());
            Ok(stored)
        })
    }

    fn put_many(
        &self,
        records: Vec<Value>,
        options: WriteOptions,
    ) -> StoreFuture<'_, PutManyOutcome> {
        Box::pin(async move {
            self.calls.put_many.fetch_add(1, Ordering::SeqCst);
            self.round_trip().await;
            if records.len() > MAX_BATCH_SIZE {
                return Err(StoreError::BatchTooLarge {
                    size: records.len(),
                    max: MAX_BATCH_SIZE,
                });
            }

            let now = Utc::now();
            let prepared = records
                .into_iter()
                .map(|record| prepare(record, None, &options, now))
                .collect::<StoreResult<Vec<_>>>()?;

            let mut stored = self.write_records()?;
            let mut items = Vec::with_capacity(prepared.len());
            for (key, record) in prepared {
                stored.insert(key, record.clone());
                items.push(record);
            }

            Ok(PutManyOutcome {
                processed: Processed { items },
            })
        })
    }

    fn update(
        &self,
        updates: UpdateRequest,
        key: String,
        options: WriteOptions,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.calls.update.fetch_add(1, Ordering::SeqCst);
            self.round_trip().await;
            let now = Utc::now();

            let mut records = self.write_records()?;
            let current = records
                .get(&key)
                .filter(|record| is_live(record, now.timestamp()))
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;

            // Mutate a copy so a rejected entry leaves the record untouched.
            let mut updated = current.clone();
            let obj = updated
                .as_object_mut()
                .ok_or_else(|| StoreError::remote("stored record is not an object"))?;

            for (path, entry) in &updates.entries {
                apply_entry(obj, path, entry)?;
            }
            if let Some(expires) = options.expires(now)? {
                obj.insert(EXPIRES_FIELD.to_string(), Value::from(expires));
            }

            records.insert(key, updated);
            Ok(())
        })
    }

    fn delete(&self, key: String) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.calls.delete.fetch_add(1, Ordering::SeqCst);
            self.round_trip().await;
            self.write_records()?.remove(&key);
            Ok(())
        })
    }

    fn fetch(&self, query: Option<Query>, request: PageRequest) -> StoreFuture<'_, Page> {
        Box::pin(async move {
            let call = self.calls.fetch.fetch_add(1, Ordering::SeqCst) + 1;
            self.round_trip().await;
            if self.fail_fetch_at.load(Ordering::SeqCst) == call {
                return Err(StoreError::remote(format!("fetch call {} failed", call)));
            }
            self.scan(query.as_ref(), &request)
        })
    }
}

fn generate_key() -> String {
    let mut key = Uuid::new_v4().simple().to_string();
    key.truncate(KEY_LENGTH);
    key
}

/// Attach key and expiry to an incoming record
fn prepare(
    record: Value,
    key: Option<String>,
    options: &WriteOptions,
    now: DateTime<Utc>,
) -> StoreResult<(String, Value)> {
    let mut obj = match record {
        Value::Object(obj) => obj,
        other => {
            return Err(StoreError::rejected(format!(
                "record must be an object, got {}",
                other
            )))
        }
    };

    let key = match key {
        Some(key) => key,
        None => match obj.get(KEY_FIELD) {
            Some(Value::String(existing)) => existing.clone(),
            Some(_) => return Err(StoreError::rejected("record key must be a string")),
            None => generate_key(),
        },
    };
    if key.is_empty() {
        return Err(StoreError::rejected("record key must not be empty"));
    }

    obj.insert(KEY_FIELD.to_string(), Value::String(key.clone()));
    obj.remove(EXPIRES_FIELD);
    if let Some(expires) = options.expires(now)? {
        obj.insert(EXPIRES_FIELD.to_string(), Value::from(expires));
    }

    Ok((key, Value::Object(obj)))
}

fn is_live(record: &Value, now: i64) -> bool {
    match record.get(EXPIRES_FIELD).and_then(Value::as_i64) {
        Some(expires) => expires > now,
        None => true,
    }
}

fn apply_entry(obj: &mut Map<String, Value>, path: &str, entry: &UpdateEntry) -> StoreResult<()> {
    if path == KEY_FIELD {
        return Err(StoreError::rejected("the record key cannot be updated"));
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::rejected(format!("invalid update path '{}'", path)));
    }
    let (field, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Err(StoreError::rejected("empty update path")),
    };

    if let UpdateEntry::Mutation(MutationToken::Trim) = entry {
        if let Some(parent) = parent_mut(obj, parents, false, path)? {
            parent.remove(*field);
        }
        return Ok(());
    }

    let parent = match parent_mut(obj, parents, true, path)? {
        Some(parent) => parent,
        None => return Err(StoreError::rejected(format!("invalid update path '{}'", path))),
    };

    match entry {
        UpdateEntry::Set(value) => {
            parent.insert(field.to_string(), value.clone());
        }
        UpdateEntry::Mutation(MutationToken::Increment(delta)) => {
            let current = parent
                .get(*field)
                .cloned()
                .unwrap_or_else(|| Value::from(0));
            let next = delta.apply(&current).ok_or_else(|| {
                StoreError::rejected(format!("cannot increment non-numeric field '{}'", path))
            })?;
            parent.insert(field.to_string(), next);
        }
        UpdateEntry::Mutation(MutationToken::Append(values)) => {
            array_mut(parent, field, path)?.extend(values.iter().cloned());
        }
        UpdateEntry::Mutation(MutationToken::Prepend(values)) => {
            let array = array_mut(parent, field, path)?;
            array.splice(0..0, values.iter().cloned());
        }
        UpdateEntry::Mutation(MutationToken::Trim) => {}
    }
    Ok(())
}

/// Walk to the object holding the final path segment.
///
/// With `create`, missing intermediate objects are created; without it a
/// missing intermediate yields `None`.
fn parent_mut<'a>(
    obj: &'a mut Map<String, Value>,
    parents: &[&str],
    create: bool,
    path: &str,
) -> StoreResult<Option<&'a mut Map<String, Value>>> {
    let mut current = obj;
    for segment in parents {
        if !current.contains_key(*segment) {
            if !create {
                return Ok(None);
            }
            current.insert(segment.to_string(), Value::Object(Map::new()));
        }
        current = match current.get_mut(*segment) {
            Some(Value::Object(next)) => next,
            _ => {
                return Err(StoreError::rejected(format!(
                    "'{}' crosses a non-object field",
                    path
                )))
            }
        };
    }
    Ok(Some(current))
}

fn array_mut<'a>(
    parent: &'a mut Map<String, Value>,
    field: &str,
    path: &str,
) -> StoreResult<&'a mut Vec<Value>> {
    let slot = parent
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(StoreError::rejected(format!(
            "cannot append to non-array field '{}'",
            path
        ))),
    }
}
