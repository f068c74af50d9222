//! # Record Façade
//!
//! [`SchemaBase`] is the typed handle over one base. Writes are validated
//! against the schema, queries and updates are checked against the path
//! table (when validation is enabled), then each call goes to the matching
//! store primitive exactly once. Nothing is retried.

use std::marker::PhantomData;

use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::BaseConfig;
use crate::error::{BaseError, BaseResult};
use crate::observability::{log_event, BaseMetrics, Event};
use crate::query::{PathTable, Query};
use crate::schema::{Schema, SchemaValidator};
use crate::store::{Store, StoreResult, WriteOptions, MAX_BATCH_SIZE};
use crate::update::{translate, Updates, Util};

use super::options::FetchOptions;
use super::paginator::Paginator;
use super::response::{
    decode, decode_all, ChunkOutcome, ChunkedPutManyResponse, FetchResponse, OutputRecord,
    ProcessedItems, PutManyResponse,
};

/// Typed, schema-checked handle over one base
pub struct SchemaBase<T, S> {
    name: String,
    store: S,
    validator: SchemaValidator,
    paths: PathTable,
    config: BaseConfig,
    metrics: BaseMetrics,
    _record: PhantomData<fn() -> T>,
}

impl<T, S: Store> SchemaBase<T, S> {
    /// Base named after the schema
    pub fn new(store: S, schema: Schema, config: BaseConfig) -> BaseResult<Self> {
        let name = schema.name.clone();
        Self::named(name, store, schema, config)
    }

    /// Base with an explicit name.
    ///
    /// Fails if the schema itself is malformed (reserved fields, bad
    /// patterns). The path table is built here once.
    pub fn named(
        name: impl Into<String>,
        store: S,
        schema: Schema,
        config: BaseConfig,
    ) -> BaseResult<Self> {
        let name = name.into();
        let paths = PathTable::from_schema(&schema);
        let validator = SchemaValidator::new(schema)?;

        let leaf_paths = paths.len().to_string();
        log_event(
            Event::BaseOpened,
            &[
                ("base", name.as_str()),
                ("paths", leaf_paths.as_str()),
                ("validation", if config.validation { "on" } else { "off" }),
            ],
        );

        Ok(Self {
            name,
            store,
            validator,
            paths,
            config,
            metrics: BaseMetrics::new(),
            _record: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        self.validator.schema()
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    pub fn config(&self) -> &BaseConfig {
        &self.config
    }

    pub fn metrics(&self) -> &BaseMetrics {
        &self.metrics
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Update action factories
    pub fn util(&self) -> Util {
        Util
    }

    /// Retrieve a record by key
    pub async fn get(&self, key: &str) -> BaseResult<Option<OutputRecord<T>>>
    where
        T: DeserializeOwned,
    {
        self.metrics.increment_reads();
        let found = self.observe("get", self.store.get(key.to_string()).await)?;
        found.map(decode).transpose()
    }

    /// Delete a record; deleting an absent key is not an error
    pub async fn delete(&self, key: &str) -> BaseResult<()> {
        self.observe("delete", self.store.delete(key.to_string()).await)?;
        self.metrics.increment_deletes();
        log_event(Event::RecordDeleted, &[("base", self.name.as_str()), ("key", key)]);
        Ok(())
    }

    /// Apply an update map to an existing record
    pub async fn update(&self, updates: Updates, key: &str) -> BaseResult<()> {
        self.update_with(updates, key, WriteOptions::default()).await
    }

    pub async fn update_with(
        &self,
        updates: Updates,
        key: &str,
        options: WriteOptions,
    ) -> BaseResult<()> {
        if self.config.validation {
            if let Err(violations) = self.paths.check_updates(&updates, &self.validator) {
                self.metrics.increment_path_rejections();
                let count = violations.len().to_string();
                log_event(
                    Event::UpdateRejected,
                    &[("base", self.name.as_str()), ("key", key), ("violations", count.as_str())],
                );
                return Err(BaseError::InvalidUpdate(violations));
            }
        }

        let request = translate(&self.store, updates);
        self.observe(
            "update",
            self.store.update(request, key.to_string(), options).await,
        )?;
        self.metrics.increment_updates();
        log_event(Event::RecordUpdated, &[("base", self.name.as_str()), ("key", key)]);
        Ok(())
    }

    /// Fetch records matching `query` (all records for `None`)
    pub async fn fetch(
        &self,
        query: Option<Query>,
        options: FetchOptions,
    ) -> BaseResult<FetchResponse<T>>
    where
        T: DeserializeOwned,
    {
        if let (true, Some(query)) = (self.config.validation, &query) {
            if let Err(violations) = self.paths.check_query(query) {
                self.metrics.increment_path_rejections();
                let count = violations.len().to_string();
                log_event(
                    Event::QueryRejected,
                    &[("base", self.name.as_str()), ("violations", count.as_str())],
                );
                return Err(BaseError::InvalidQuery(violations));
            }
        }

        self.metrics.increment_fetches();
        let page = Paginator::new(&self.store)
            .for_base(&self.name)
            .with_metrics(&self.metrics)
            .fetch(query, &options)
            .await?;

        Ok(FetchResponse {
            count: page.count,
            items: decode_all(page.items)?,
            last: page.last,
        })
    }

    /// Fetch with a query in its wire form: an object of `path?op` keys, or
    /// a list of such objects combined with OR. Malformed keys and unknown
    /// operators fail before any store call.
    pub async fn fetch_json(
        &self,
        query: &Value,
        options: FetchOptions,
    ) -> BaseResult<FetchResponse<T>>
    where
        T: DeserializeOwned,
    {
        let query = Query::from_value(query)?;
        self.fetch(Some(query), options).await
    }

    /// Log and count a store failure, then convert it
    fn observe<R>(&self, operation: &str, result: StoreResult<R>) -> BaseResult<R> {
        result.map_err(|e| {
            self.metrics.increment_store_errors();
            let error = e.to_string();
            log_event(
                Event::StoreFailed,
                &[
                    ("base", self.name.as_str()),
                    ("error", error.as_str()),
                    ("operation", operation),
                ],
            );
            BaseError::Store(e)
        })
    }
}

impl<T: Serialize + DeserializeOwned, S: Store> SchemaBase<T, S> {
    /// Check records against the schema without writing them.
    ///
    /// All-or-nothing: every violation of every record is reported.
    /// A no-op when validation is disabled.
    pub fn validate_many(&self, records: &[T]) -> BaseResult<()> {
        self.encode_all(records).map(|_| ())
    }

    /// Store a record, replacing any record under the same key
    pub async fn put(&self, record: &T, key: Option<&str>) -> BaseResult<Option<OutputRecord<T>>> {
        self.put_with(record, key, WriteOptions::default()).await
    }

    pub async fn put_with(
        &self,
        record: &T,
        key: Option<&str>,
        options: WriteOptions,
    ) -> BaseResult<Option<OutputRecord<T>>> {
        let value = self.encode_one(record)?;
        let stored = self.observe(
            "put",
            self.store
                .put(value, key.map(str::to_string), options)
                .await,
        )?;
        self.written(1);
        stored.map(decode).transpose()
    }

    /// Store a record; fails with a conflict if the key already exists
    pub async fn insert(&self, record: &T, key: Option<&str>) -> BaseResult<OutputRecord<T>> {
        self.insert_with(record, key, WriteOptions::default()).await
    }

    pub async fn insert_with(
        &self,
        record: &T,
        key: Option<&str>,
        options: WriteOptions,
    ) -> BaseResult<OutputRecord<T>> {
        let value = self.encode_one(record)?;
        let stored = self.observe(
            "insert",
            self.store
                .insert(value, key.map(str::to_string), options)
                .await,
        )?;
        self.written(1);
        decode(stored)
    }

    /// Store up to 25 records in one store call
    pub async fn put_many(&self, records: &[T]) -> BaseResult<PutManyResponse<T>> {
        self.put_many_with(records, WriteOptions::default()).await
    }

    pub async fn put_many_with(
        &self,
        records: &[T],
        options: WriteOptions,
    ) -> BaseResult<PutManyResponse<T>> {
        if records.len() > MAX_BATCH_SIZE {
            let size = records.len().to_string();
            log_event(
                Event::BatchRejected,
                &[("base", self.name.as_str()), ("size", size.as_str())],
            );
            return Err(BaseError::LimitExceeded {
                size: records.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let values = self.encode_all(records)?;
        let outcome = self.observe("put_many", self.store.put_many(values, options).await)?;
        let items = decode_all(outcome.processed.items)?;
        self.written(items.len());
        Ok(PutManyResponse {
            processed: ProcessedItems { items },
        })
    }

    /// Store any number of records in chunks of at most 25.
    ///
    /// The whole batch is validated first. Chunks are then sent
    /// concurrently and each chunk's failure is reported on its own; a
    /// failed chunk does not stop the others.
    pub async fn put_many_chunked(
        &self,
        records: &[T],
        options: WriteOptions,
    ) -> BaseResult<ChunkedPutManyResponse<T>> {
        let values = self.encode_all(records)?;

        let mut chunks = Vec::new();
        let mut rest = values;
        while !rest.is_empty() {
            let tail = rest.split_off(rest.len().min(MAX_BATCH_SIZE));
            chunks.push(std::mem::replace(&mut rest, tail));
        }

        let calls = chunks.into_iter().enumerate().map(|(index, chunk)| {
            let options = options.clone();
            async move {
                let size = chunk.len();
                let result = match self.store.put_many(chunk, options).await {
                    Ok(outcome) => decode_all(outcome.processed.items),
                    Err(e) => Err(BaseError::Store(e)),
                };
                ChunkOutcome {
                    index,
                    offset: index * MAX_BATCH_SIZE,
                    size,
                    result,
                }
            }
        });

        let outcomes = join_all(calls).await;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(items) => self.written(items.len()),
                Err(e) => {
                    self.metrics.increment_chunk_failures();
                    let index = outcome.index.to_string();
                    let error = e.to_string();
                    log_event(
                        Event::ChunkFailed,
                        &[("base", self.name.as_str()), ("chunk", index.as_str()), ("error", error.as_str())],
                    );
                }
            }
        }

        Ok(ChunkedPutManyResponse { chunks: outcomes })
    }

    fn encode_one(&self, record: &T) -> BaseResult<Value> {
        let mut values = self.encode_all(std::slice::from_ref(record))?;
        Ok(values.remove(0))
    }

    fn encode_all(&self, records: &[T]) -> BaseResult<Vec<Value>> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(BaseError::Encode)?;

        if self.config.validation {
            if let Err(e) = self.validator.validate_many(&values) {
                self.metrics.increment_validation_failures();
                let violations = e.violations().len().to_string();
                log_event(
                    Event::ValidationRejected,
                    &[
                        ("base", self.name.as_str()),
                        ("code", e.code().code()),
                        ("violations", violations.as_str()),
                    ],
                );
                return Err(e.into());
            }
        }
        Ok(values)
    }

    fn written(&self, count: usize) {
        self.metrics.add_records_written(count as u64);
        let count = count.to_string();
        log_event(
            Event::RecordsWritten,
            &[("base", self.name.as_str()), ("count", count.as_str())],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryMap;
    use crate::schema::{FieldDef, FieldType};
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
        qty: i64,
        tags: Vec<String>,
    }

    fn item(name: &str, qty: i64) -> Item {
        Item {
            name: name.to_string(),
            qty,
            tags: Vec::new(),
        }
    }

    fn schema() -> Schema {
        Schema::new("items", BTreeMap::new())
            .with_field("name", FieldDef::required_string().length(1, 8))
            .with_field("qty", FieldDef::required_int().min(0.0))
            .with_field("tags", FieldDef::required_array(FieldType::String))
    }

    fn base(config: BaseConfig) -> SchemaBase<Item, MemoryStore> {
        SchemaBase::new(MemoryStore::new(), schema(), config).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let base = base(BaseConfig::default());
        let stored = base.put(&item("apple", 3), Some("a")).await.unwrap().unwrap();
        assert_eq!(stored.key, "a");
        assert_eq!(stored.record, item("apple", 3));

        let fetched = base.get("a").await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(base.name(), "items");
    }

    #[tokio::test]
    async fn test_invalid_record_never_reaches_store() {
        let base = base(BaseConfig::default());
        let err = base.put(&item("", -1), None).await.unwrap_err();
        let schema_error = err.schema_error().unwrap();
        assert!(schema_error.names_field("name"));
        assert!(schema_error.names_field("qty"));
        assert_eq!(base.store().calls().total(), 0);
        assert_eq!(base.metrics().snapshot().validation_failures, 1);
    }

    #[tokio::test]
    async fn test_validation_disabled_passes_through() {
        let base = base(BaseConfig::unvalidated());
        assert!(base.put(&item("", -1), Some("x")).await.is_ok());
        assert_eq!(base.store().calls().put, 1);
    }

    #[tokio::test]
    async fn test_put_many_limit() {
        let base = base(BaseConfig::default());
        let records: Vec<_> = (0..26).map(|i| item("x", i)).collect();
        let err = base.put_many(&records).await.unwrap_err();
        assert!(matches!(err, BaseError::LimitExceeded { size: 26, max: 25 }));
        assert_eq!(base.store().calls().put_many, 0);
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let base = base(BaseConfig::default());
        base.insert(&item("a", 1), Some("k")).await.unwrap();
        let err = base.insert(&item("b", 2), Some("k")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(base.metrics().snapshot().store_errors, 1);
    }

    #[tokio::test]
    async fn test_rejected_update_and_query() {
        let base = base(BaseConfig::default());
        let util = base.util();

        let err = base
            .update(Updates::new().apply("name", util.increment(1)), "k")
            .await
            .unwrap_err();
        assert!(matches!(err, BaseError::InvalidUpdate(_)));

        let err = base
            .fetch(
                Some(QueryMap::new().prefix("qty", "1").into()),
                FetchOptions::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BaseError::InvalidQuery(_)));
        assert_eq!(base.store().calls().total(), 0);
    }

    #[tokio::test]
    async fn test_unvalidated_ill_typed_action_fails_at_store() {
        let base = base(BaseConfig::unvalidated());
        base.put(&item("a", 1), Some("k")).await.unwrap();
        let err = base
            .update(Updates::new().apply("name", base.util().increment(1)), "k")
            .await
            .unwrap_err();
        assert!(matches!(err, BaseError::Store(_)));
    }

    #[tokio::test]
    async fn test_chunked_put_many() {
        let base = base(BaseConfig::default());
        let records: Vec<_> = (0..60).map(|i| item("x", i)).collect();
        let response = base
            .put_many_chunked(&records, WriteOptions::default())
            .await
            .unwrap();
        assert!(response.is_complete());
        assert_eq!(response.chunks.len(), 3);
        assert_eq!(response.chunks[2].size, 10);
        assert_eq!(response.chunks[2].offset, 50);
        assert_eq!(response.items().count(), 60);
        assert_eq!(base.store().calls().put_many, 3);
    }
}
