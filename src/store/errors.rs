//! # Store Errors
//!
//! Failures reported by the store collaborator.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store collaborator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Insert of a key that already exists
    #[error("Key already exists: {0}")]
    Conflict(String),

    /// Update of a key that does not exist
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Batch larger than the store accepts in one call
    #[error("Batch of {size} items exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Request understood but refused (bad payload, type-incompatible mutation)
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Transport, auth or quota failure
    #[error("Remote error: {0}")]
    Remote(String),
}

impl StoreError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }
}
