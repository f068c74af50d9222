//! Schema descriptor for Base records
//!
//! A schema is the single description of a record's shape. It drives both
//! write-time validation and the path table used to check queries and
//! updates.
//!
//! # Design Principles
//!
//! - Immutable once a validator is built from it
//! - Validation before any store call
//! - Violations are collected, never truncated to the first
//! - No defaults or coercion

mod errors;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, ValidationDetails};
pub use types::{
    Constraints, FieldDef, FieldType, Schema, EXPIRES_FIELD, KEY_FIELD, RESERVED_FIELDS,
};
pub use validator::{value_conforms, SchemaValidator};
