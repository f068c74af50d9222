//! Observable events
//!
//! Every log line a base emits names one of these events.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Façade constructed over a store
    BaseOpened,
    /// put / insert / put_many completed
    RecordsWritten,
    /// update completed
    RecordUpdated,
    /// delete completed
    RecordDeleted,
    /// Records refused by the schema before any store call
    ValidationRejected,
    /// Query keys refused by the path table
    QueryRejected,
    /// Update entries refused by the path table
    UpdateRejected,
    /// put_many batch over the store cap
    BatchRejected,
    /// One page returned by the store
    PageFetched,
    /// Pagination loop finished
    FetchComplete,
    /// A page failed; accumulated items are dropped
    FetchFailed,
    /// One chunk of a chunked put_many failed
    ChunkFailed,
    /// Store call failed
    StoreFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BaseOpened => "BASE_OPENED",
            Event::RecordsWritten => "RECORDS_WRITTEN",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordDeleted => "RECORD_DELETED",
            Event::ValidationRejected => "VALIDATION_REJECTED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::UpdateRejected => "UPDATE_REJECTED",
            Event::BatchRejected => "BATCH_REJECTED",
            Event::PageFetched => "PAGE_FETCHED",
            Event::FetchComplete => "FETCH_COMPLETE",
            Event::FetchFailed => "FETCH_FAILED",
            Event::ChunkFailed => "CHUNK_FAILED",
            Event::StoreFailed => "STORE_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::PageFetched => Severity::Trace,
            Event::BaseOpened
            | Event::RecordsWritten
            | Event::RecordUpdated
            | Event::RecordDeleted
            | Event::FetchComplete => Severity::Info,
            Event::ValidationRejected
            | Event::QueryRejected
            | Event::UpdateRejected
            | Event::BatchRejected => Severity::Warn,
            Event::FetchFailed | Event::ChunkFailed | Event::StoreFailed => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
