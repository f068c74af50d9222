//! schemabase - typed, schema-checked records over a remote key-value store
//!
//! A [`SchemaBase`] wraps a [`Store`] with one schema. Writes are validated
//! before any store call, queries and updates are checked against the
//! schema's leaf paths, update actions are translated into the store's
//! mutation tokens, and multi-page fetches are stitched into one result.

pub mod base;
pub mod config;
pub mod error;
pub mod observability;
pub mod query;
pub mod schema;
pub mod store;
pub mod update;

pub use base::{FetchOptions, FetchResponse, OutputRecord, PutManyResponse, SchemaBase};
pub use config::{BaseConfig, Credentials, KeyKind, Project};
pub use error::{BaseError, BaseResult};
pub use query::{Query, QueryMap};
pub use schema::{FieldDef, FieldType, Schema};
pub use store::{MemoryStore, Store, WriteOptions};
pub use update::{Action, Updates, Util};
