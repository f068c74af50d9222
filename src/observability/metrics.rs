//! Per-base counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics; a snapshot is not a consistent cut across counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct BaseMetrics {
    /// Records accepted by put, insert and put_many
    records_written: AtomicU64,
    /// get calls
    reads: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    /// Logical fetch calls
    fetches: AtomicU64,
    /// Physical store fetch calls
    pages_fetched: AtomicU64,
    items_fetched: AtomicU64,
    validation_failures: AtomicU64,
    /// Queries and updates refused by the path table
    path_rejections: AtomicU64,
    chunk_failures: AtomicU64,
    store_errors: AtomicU64,
}

impl BaseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_records_written(&self, n: u64) {
        self.records_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_reads(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fetches(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one page of `items` results
    pub fn record_page(&self, items: u64) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.items_fetched.fetch_add(items, Ordering::Relaxed);
    }

    pub fn increment_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_path_rejections(&self) {
        self.path_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunk_failures(&self) {
        self.chunk_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_store_errors(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_written: self.records_written.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            items_fetched: self.items_fetched.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            path_rejections: self.path_rejections.load(Ordering::Relaxed),
            chunk_failures: self.chunk_failures.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }

    /// Snapshot as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_written: u64,
    pub reads: u64,
    pub updates: u64,
    pub deletes: u64,
    pub fetches: u64,
    pub pages_fetched: u64,
    pub items_fetched: u64,
    pub validation_failures: u64,
    pub path_rejections: u64,
    pub chunk_failures: u64,
    pub store_errors: u64,
}
