//! Schema type definitions
//!
//! Supported types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - bool: Boolean
//! - object: Nested record with its own field schema
//! - array: Homogeneous array with element type

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult};

/// Storage key attached by the store to every output record.
pub const KEY_FIELD: &str = "key";

/// Expiry marker attached by the store when a record has a TTL.
pub const EXPIRES_FIELD: &str = "__expires";

/// Field names that user schemas may never declare at the top level.
pub const RESERVED_FIELDS: [&str; 2] = [KEY_FIELD, EXPIRES_FIELD];

/// Supported field types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Nested record with its own field schema
    Object {
        /// Nested field definitions
        fields: BTreeMap<String, FieldDef>,
    },
    /// Homogeneous array with single element type
    Array {
        /// Element type (boxed to allow recursive types)
        #[serde(rename = "element_type")]
        element_type: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
        }
    }

    /// Whether values of this type are numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }
}

/// Value constraints checked by the validator.
///
/// Length bounds apply to strings (in characters) and arrays (in elements);
/// `min`/`max` apply to numbers; `pattern` applies to strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Constraints {
    /// True when no constraint is set
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }
}

fn default_required() -> bool {
    true
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether field must be present
    #[serde(default = "default_required")]
    pub required: bool,
    /// Whether an explicit null is accepted
    #[serde(default)]
    pub nullable: bool,
    /// Value constraints
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
}

impl FieldDef {
    fn of(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
            nullable: false,
            constraints: Constraints::default(),
        }
    }

    /// Create a required string field
    pub fn required_string() -> Self {
        Self::of(FieldType::String, true)
    }

    /// Create an optional string field
    pub fn optional_string() -> Self {
        Self::of(FieldType::String, false)
    }

    /// Create a required int field
    pub fn required_int() -> Self {
        Self::of(FieldType::Int, true)
    }

    /// Create an optional int field
    pub fn optional_int() -> Self {
        Self::of(FieldType::Int, false)
    }

    /// Create a required float field
    pub fn required_float() -> Self {
        Self::of(FieldType::Float, true)
    }

    /// Create an optional float field
    pub fn optional_float() -> Self {
        Self::of(FieldType::Float, false)
    }

    /// Create a required bool field
    pub fn required_bool() -> Self {
        Self::of(FieldType::Bool, true)
    }

    /// Create an optional bool field
    pub fn optional_bool() -> Self {
        Self::of(FieldType::Bool, false)
    }

    /// Create a required object field
    pub fn required_object(fields: BTreeMap<String, FieldDef>) -> Self {
        Self::of(FieldType::Object { fields }, true)
    }

    /// Create an optional object field
    pub fn optional_object(fields: BTreeMap<String, FieldDef>) -> Self {
        Self::of(FieldType::Object { fields }, false)
    }

    /// Create a required array field
    pub fn required_array(element_type: FieldType) -> Self {
        Self::of(
            FieldType::Array {
                element_type: Box::new(element_type),
            },
            true,
        )
    }

    /// Create an optional array field
    pub fn optional_array(element_type: FieldType) -> Self {
        Self::of(
            FieldType::Array {
                element_type: Box::new(element_type),
            },
            false,
        )
    }

    /// Accept explicit nulls for this field
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Minimum length (string characters or array elements)
    pub fn min_length(mut self, len: usize) -> Self {
        self.constraints.min_length = Some(len);
        self
    }

    /// Maximum length (string characters or array elements)
    pub fn max_length(mut self, len: usize) -> Self {
        self.constraints.max_length = Some(len);
        self
    }

    /// Inclusive length range
    pub fn length(self, min: usize, max: usize) -> Self {
        self.min_length(min).max_length(max)
    }

    /// Regular expression a string value must match
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    /// Inclusive numeric lower bound
    pub fn min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    /// Inclusive numeric upper bound
    pub fn max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }
}

/// Complete schema definition for the records of one Base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name, usually the Base name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions
    pub fields: BTreeMap<String, FieldDef>,
}

impl Schema {
    /// Create a new schema
    pub fn new(name: impl Into<String>, fields: BTreeMap<String, FieldDef>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
        }
    }

    /// Add a field, replacing any previous definition with the same name
    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse a schema from its JSON representation
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        serde_json::from_str(json).map_err(|e| SchemaError::malformed_schema(e.to_string()))
    }

    /// Validates the schema structure itself (not a record)
    pub fn validate_structure(&self) -> SchemaResult<()> {
        for reserved in RESERVED_FIELDS {
            if self.fields.contains_key(reserved) {
                return Err(SchemaError::reserved_field(reserved));
            }
        }
        check_names(&self.fields, "")
    }
}

fn check_names(fields: &BTreeMap<String, FieldDef>, prefix: &str) -> SchemaResult<()> {
    for (name, def) in fields {
        // Dots and query separators would make projected paths ambiguous.
        if name.is_empty() || name.contains('.') || name.contains('?') {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            return Err(SchemaError::malformed_schema(format!(
                "invalid field name '{}'",
                path
            )));
        }
        if let FieldType::Object { fields } = &def.field_type {
            let nested = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            check_names(fields, &nested)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;

    #[test]
    fn test_reserved_key_rejected() {
        let schema = Schema::new("users", BTreeMap::new()).with_field("key", FieldDef::required_string());
        let err = schema.validate_structure().unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ReservedField);
    }

    #[test]
    fn test_reserved_expires_rejected() {
        let schema =
            Schema::new("users", BTreeMap::new()).with_field("__expires", FieldDef::required_int());
        assert!(schema.validate_structure().is_err());
    }

    #[test]
    fn test_reserved_names_allowed_when_nested() {
        let mut inner = BTreeMap::new();
        inner.insert("key".to_string(), FieldDef::required_string());
        let schema = Schema::new("users", BTreeMap::new()).with_field("meta", FieldDef::required_object(inner));
        assert!(schema.validate_structure().is_ok());
    }

    #[test]
    fn test_dotted_field_name_rejected() {
        let schema = Schema::new("users", BTreeMap::new()).with_field("a.b", FieldDef::required_int());
        let err = schema.validate_structure().unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedSchema);
        assert!(err.message().contains("a.b"));
    }

    #[test]
    fn test_schema_json_round_trip() {
        let json = r#"{
            "name": "users",
            "fields": {
                "username": {"type": "string", "constraints": {"min_length": 3, "max_length": 16}},
                "age": {"type": "int", "required": false},
                "tags": {"type": "array", "element_type": {"type": "string"}}
            }
        }"#;
        let schema = Schema::from_json(json).unwrap();
        let username = &schema.fields["username"];
        assert!(username.required);
        assert_eq!(username.constraints.min_length, Some(3));
        assert!(!schema.fields["age"].required);
        assert_eq!(schema.fields["tags"].field_type.type_name(), "array");
    }

    #[test]
    fn test_malformed_json_schema() {
        let err = Schema::from_json("{\"name\": 1}").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedSchema);
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::String.type_name(), "string");
        assert_eq!(FieldType::Int.type_name(), "int");
        assert_eq!(FieldType::Float.type_name(), "float");
        assert_eq!(FieldType::Bool.type_name(), "bool");
        assert!(FieldType::Float.is_numeric());
        assert!(!FieldType::String.is_numeric());
    }
}
