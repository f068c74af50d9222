//! # Query Errors

use std::fmt;

use thiserror::Error;

/// Result type for query parsing
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while parsing the wire form of a query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Key has an empty path or an empty path segment
    #[error("Invalid query key: '{0}'")]
    InvalidKey(String),

    /// Key suffix is not a known operator
    #[error("Unknown operator '{suffix}' in query key '{key}'")]
    UnknownOperator { key: String, suffix: String },

    /// Query (or one of its alternatives) is not a JSON object
    #[error("Query must be an object or a list of objects, got {0}")]
    NotAnObject(String),
}

/// A query key or update path that the schema does not allow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathViolation {
    /// Offending key as written by the caller
    pub key: String,
    /// Why it was rejected
    pub reason: String,
}

impl PathViolation {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_path(key: impl Into<String>) -> Self {
        Self::new(key, "path is not a leaf field of the schema")
    }
}

impl fmt::Display for PathViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.key, self.reason)
    }
}

/// Join violations for error messages
pub fn describe(violations: &[PathViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_joins_violations() {
        let text = describe(&[
            PathViolation::unknown_path("nope"),
            PathViolation::new("age?pfx", "operator not allowed"),
        ]);
        assert!(text.contains("'nope'"));
        assert!(text.contains("; 'age?pfx'"));
    }
}
