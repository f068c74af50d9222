//! # Queries
//!
//! Query expressions in the store's wire dialect, and the schema-derived
//! path table that decides which keys, operators and update actions are
//! legal for a base.

mod errors;
mod filter;
mod paths;

pub use errors::{describe, PathViolation, QueryError, QueryResult};
pub use filter::{lookup, Condition, Query, QueryMap, QueryOperator, OPERATOR_SEPARATOR};
pub use paths::{FieldCategory, PathInfo, PathTable};
