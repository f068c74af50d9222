//! # Bases
//!
//! The typed record façade and the pieces it composes: fetch options,
//! typed responses and the multi-page fetch loop.

mod facade;
mod options;
mod paginator;
mod response;

pub use facade::SchemaBase;
pub use options::FetchOptions;
pub use paginator::Paginator;
pub use response::{
    ChunkOutcome, ChunkedPutManyResponse, FetchResponse, OutputRecord, ProcessedItems,
    PutManyResponse,
};
