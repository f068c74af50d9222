//! Schema error types
//!
//! Error codes:
//! - SCHEMA_VALIDATION_FAILED
//! - SCHEMA_RESERVED_FIELD
//! - SCHEMA_INVALID_PATTERN
//! - SCHEMA_MALFORMED

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// One or more records violate the schema
    ValidationFailed,
    /// Schema declares a name reserved by the store
    ReservedField,
    /// A `pattern` constraint is not a valid regular expression
    InvalidPattern,
    /// Schema definition cannot be parsed or is structurally invalid
    MalformedSchema,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::ValidationFailed => "SCHEMA_VALIDATION_FAILED",
            SchemaErrorCode::ReservedField => "SCHEMA_RESERVED_FIELD",
            SchemaErrorCode::InvalidPattern => "SCHEMA_INVALID_PATTERN",
            SchemaErrorCode::MalformedSchema => "SCHEMA_MALFORMED",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single field-level violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Index of the offending record within the validated batch
    pub record: Option<usize>,
    /// Field path (e.g., "profile.username", "tags[2]")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            record: None,
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn reserved_field(field: impl Into<String>) -> Self {
        Self::new(field, "no reserved fields", "reserved field present")
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }

    /// Tag the violation with the index of its record in a batch
    pub fn in_record(mut self, index: usize) -> Self {
        self.record = Some(index);
        self
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(index) = self.record {
            write!(f, "record {} ", index)?;
        }
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    violations: Vec<ValidationDetails>,
}

impl SchemaError {
    /// Create a validation failed error carrying every violation found
    pub fn validation_failed(violations: Vec<ValidationDetails>) -> Self {
        let message = match violations.len() {
            1 => format!("Record validation failed: {}", violations[0]),
            n => format!(
                "Record validation failed with {} violations: {}",
                n,
                violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        };
        Self {
            code: SchemaErrorCode::ValidationFailed,
            message,
            violations,
        }
    }

    /// Create a reserved field error
    pub fn reserved_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            code: SchemaErrorCode::ReservedField,
            message: format!("Field '{}' is reserved and cannot be declared", field),
            violations: Vec::new(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::InvalidPattern,
            message: format!(
                "Invalid pattern on field '{}': {}",
                field.into(),
                reason.into()
            ),
            violations: Vec::new(),
        }
    }

    /// Create an error for a malformed schema definition
    pub fn malformed_schema(reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::MalformedSchema,
            message: format!("Malformed schema: {}", reason.into()),
            violations: Vec::new(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns every field-level violation (empty for structural errors)
    pub fn violations(&self) -> &[ValidationDetails] {
        &self.violations
    }

    /// Returns the first violation, if any
    pub fn details(&self) -> Option<&ValidationDetails> {
        self.violations.first()
    }

    /// True if any violation names the given field path
    pub fn names_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
