//! # Base Errors
//!
//! Everything a base operation can fail with. Validation failures happen
//! before any store call; store failures are propagated unchanged.

use thiserror::Error;

use crate::query::{describe, PathViolation, QueryError};
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result type for base operations
pub type BaseResult<T> = Result<T, BaseError>;

#[derive(Debug, Error)]
pub enum BaseError {
    /// Records do not conform to the schema; carries every violation
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Failure reported by the store (conflict, not found, remote)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Batch larger than one put_many call accepts
    #[error("Batch of {size} records exceeds the put_many limit of {max}")]
    LimitExceeded { size: usize, max: usize },

    /// Query keys or operands the schema does not allow
    #[error("Invalid query: {}", describe(.0))]
    InvalidQuery(Vec<PathViolation>),

    /// Update paths or actions the schema does not allow
    #[error("Invalid update: {}", describe(.0))]
    InvalidUpdate(Vec<PathViolation>),

    /// Query wire form could not be parsed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Record could not be converted to JSON
    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    /// Store payload does not match the record type
    #[error("Failed to decode record: {0}")]
    Decode(#[source] serde_json::Error),

    /// Credentials or base name could not be resolved
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BaseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Raised locally before any store call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BaseError::Schema(_)
                | BaseError::InvalidQuery(_)
                | BaseError::InvalidUpdate(_)
                | BaseError::LimitExceeded { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, BaseError::Store(StoreError::Conflict(_)))
    }

    /// Transport, auth or quota failure from the store
    pub fn is_remote(&self) -> bool {
        matches!(self, BaseError::Store(StoreError::Remote(_)))
    }

    /// The schema error, if this is a validation failure
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            BaseError::Schema(e) => Some(e),
            _ => None,
        }
    }
}
