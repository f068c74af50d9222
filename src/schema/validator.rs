//! Schema validator for candidate records
//!
//! Validation semantics:
//! - All required fields are present
//! - No undeclared fields exist
//! - Reserved store fields are never supplied by the caller
//! - Field types exactly match schema types (ints are accepted as floats)
//! - Nulls only where the field is nullable
//! - Constraints (length, pattern, numeric bounds) hold
//!
//! Unlike a fail-fast check, every violation in every record is collected so
//! the caller gets one actionable report per batch.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::types::{Constraints, FieldDef, FieldType, Schema, RESERVED_FIELDS};

/// Schema validator that enforces schema rules on records.
///
/// Owns the schema and its compiled patterns; immutable after construction.
/// Validator does not mutate records.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
    patterns: HashMap<String, Regex>,
}

impl SchemaValidator {
    /// Creates a validator, checking the schema structure and compiling
    /// every `pattern` constraint up front.
    pub fn new(schema: Schema) -> SchemaResult<Self> {
        schema.validate_structure()?;

        let mut patterns = HashMap::new();
        compile_patterns(&schema.fields, "", &mut patterns)?;

        Ok(Self { schema, patterns })
    }

    /// Returns the schema being enforced
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates a single record.
    pub fn validate(&self, record: &Value) -> SchemaResult<()> {
        let violations = self.violations(record);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::validation_failed(violations))
        }
    }

    /// Validates a batch of records; all-or-nothing.
    ///
    /// Each violation is tagged with the index of its record.
    pub fn validate_many(&self, records: &[Value]) -> SchemaResult<()> {
        let violations: Vec<ValidationDetails> = records
            .iter()
            .enumerate()
            .flat_map(|(i, record)| {
                self.violations(record)
                    .into_iter()
                    .map(move |v| v.in_record(i))
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::validation_failed(violations))
        }
    }

    /// Collects every violation of a single record
    pub fn violations(&self, record: &Value) -> Vec<ValidationDetails> {
        let mut out = Vec::new();

        let obj = match record.as_object() {
            Some(obj) => obj,
            None => {
                out.push(ValidationDetails::type_mismatch(
                    "$root",
                    "object",
                    json_type_name(record),
                ));
                return out;
            }
        };

        for reserved in RESERVED_FIELDS {
            if obj.contains_key(reserved) {
                out.push(ValidationDetails::reserved_field(reserved));
            }
        }

        self.validate_object(obj, &self.schema.fields, "", &mut out);
        out
    }

    /// Violations of a single value stored at `path`, checked against a
    /// leaf's type and constraints.
    pub fn value_violations(
        &self,
        path: &str,
        value: &Value,
        field_type: &FieldType,
        constraints: &Constraints,
    ) -> Vec<ValidationDetails> {
        let mut out = Vec::new();
        self.validate_value(value, field_type, constraints, path, &mut out);
        out
    }

    fn validate_object(
        &self,
        obj: &Map<String, Value>,
        fields: &BTreeMap<String, FieldDef>,
        path_prefix: &str,
        out: &mut Vec<ValidationDetails>,
    ) {
        for key in obj.keys() {
            let reserved = path_prefix.is_empty() && RESERVED_FIELDS.contains(&key.as_str());
            if !fields.contains_key(key) && !reserved {
                out.push(ValidationDetails::extra_field(make_path(path_prefix, key)));
            }
        }

        for (field_name, field_def) in fields {
            let field_path = make_path(path_prefix, field_name);

            match obj.get(field_name) {
                Some(Value::Null) => {
                    if !field_def.nullable {
                        out.push(ValidationDetails::null_value(&field_path));
                    }
                }
                Some(value) => {
                    self.validate_value(
                        value,
                        &field_def.field_type,
                        &field_def.constraints,
                        &field_path,
                        out,
                    );
                }
                None => {
                    if field_def.required {
                        out.push(ValidationDetails::missing_field(field_path));
                    }
                }
            }
        }
    }

    fn validate_value(
        &self,
        value: &Value,
        expected_type: &FieldType,
        constraints: &Constraints,
        field_path: &str,
        out: &mut Vec<ValidationDetails>,
    ) {
        match expected_type {
            FieldType::String => match value.as_str() {
                Some(s) => {
                    check_length(s.chars().count(), constraints, field_path, out);
                    if let Some(pattern) = &constraints.pattern {
                        if let Some(re) = self.patterns.get(pattern) {
                            if !re.is_match(s) {
                                out.push(ValidationDetails::new(
                                    field_path,
                                    format!("string matching /{}/", pattern),
                                    format!("\"{}\"", s),
                                ));
                            }
                        }
                    }
                }
                None => out.push(type_error(field_path, "string", value)),
            },
            FieldType::Int => {
                if value.is_i64() || value.is_u64() {
                    check_bounds(value, constraints, field_path, out);
                } else {
                    out.push(type_error(field_path, "int", value));
                }
            }
            FieldType::Float => {
                if value.is_number() {
                    check_bounds(value, constraints, field_path, out);
                } else {
                    out.push(type_error(field_path, "float", value));
                }
            }
            FieldType::Bool => {
                if !value.is_boolean() {
                    out.push(type_error(field_path, "bool", value));
                }
            }
            FieldType::Object { fields } => match value.as_object() {
                Some(obj) => self.validate_object(obj, fields, field_path, out),
                None => out.push(type_error(field_path, "object", value)),
            },
            FieldType::Array { element_type } => match value.as_array() {
                Some(arr) => {
                    check_length(arr.len(), constraints, field_path, out);
                    for (i, elem) in arr.iter().enumerate() {
                        let elem_path = format!("{}[{}]", field_path, i);
                        if elem.is_null() {
                            out.push(ValidationDetails::null_value(&elem_path));
                            continue;
                        }
                        self.validate_value(
                            elem,
                            element_type,
                            &Constraints::default(),
                            &elem_path,
                            out,
                        );
                    }
                }
                None => out.push(type_error(field_path, "array", value)),
            },
        }
    }
}

/// Structural type check that ignores constraints.
///
/// Used for query operands and update values, where length or bound
/// constraints do not apply.
pub fn value_conforms(field_type: &FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Int => value.is_i64() || value.is_u64(),
        FieldType::Float => value.is_number(),
        FieldType::Bool => value.is_boolean(),
        FieldType::Object { fields } => match value.as_object() {
            Some(obj) => {
                obj.keys().all(|k| fields.contains_key(k))
                    && fields.iter().all(|(name, def)| match obj.get(name) {
                        Some(Value::Null) => def.nullable,
                        Some(v) => value_conforms(&def.field_type, v),
                        None => !def.required,
                    })
            }
            None => false,
        },
        FieldType::Array { element_type } => match value.as_array() {
            Some(arr) => arr.iter().all(|e| value_conforms(element_type, e)),
            None => false,
        },
    }
}

fn compile_patterns(
    fields: &BTreeMap<String, FieldDef>,
    prefix: &str,
    patterns: &mut HashMap<String, Regex>,
) -> SchemaResult<()> {
    for (name, def) in fields {
        let path = make_path(prefix, name);
        if let Some(pattern) = &def.constraints.pattern {
            if !patterns.contains_key(pattern) {
                let re = Regex::new(pattern)
                    .map_err(|e| SchemaError::invalid_pattern(&path, e.to_string()))?;
                patterns.insert(pattern.clone(), re);
            }
        }
        if let FieldType::Object { fields } = &def.field_type {
            compile_patterns(fields, &path, patterns)?;
        }
    }
    Ok(())
}

fn check_length(
    len: usize,
    constraints: &Constraints,
    field_path: &str,
    out: &mut Vec<ValidationDetails>,
) {
    if let Some(min) = constraints.min_length {
        if len < min {
            out.push(ValidationDetails::new(
                field_path,
                format!("length >= {}", min),
                format!("length {}", len),
            ));
        }
    }
    if let Some(max) = constraints.max_length {
        if len > max {
            out.push(ValidationDetails::new(
                field_path,
                format!("length <= {}", max),
                format!("length {}", len),
            ));
        }
    }
}

fn check_bounds(
    value: &Value,
    constraints: &Constraints,
    field_path: &str,
    out: &mut Vec<ValidationDetails>,
) {
    let n = match value.as_f64() {
        Some(n) => n,
        None => return,
    };
    if let Some(min) = constraints.min {
        if n < min {
            out.push(ValidationDetails::new(
                field_path,
                format!("value >= {}", min),
                value.to_string(),
            ));
        }
    }
    if let Some(max) = constraints.max {
        if n > max {
            out.push(ValidationDetails::new(
                field_path,
                format!("value <= {}", max),
                value.to_string(),
            ));
        }
    }
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Creates a field path from prefix and field name.
pub(crate) fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn type_error(field_path: &str, expected: &str, actual: &Value) -> ValidationDetails {
    ValidationDetails::type_mismatch(field_path, expected, json_type_name(actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> Schema {
        let mut profile = BTreeMap::new();
        profile.insert(
            "username".to_string(),
            FieldDef::required_string().length(3, 16),
        );
        profile.insert("profilePicture".to_string(), FieldDef::required_string());
        profile.insert("age".to_string(), FieldDef::required_int().min(0.0));

        let mut connections = BTreeMap::new();
        connections.insert(
            "friends".to_string(),
            FieldDef::required_array(FieldType::String),
        );
        connections.insert(
            "blocked".to_string(),
            FieldDef::required_array(FieldType::String),
        );

        Schema::new("users", BTreeMap::new())
            .with_field("profile", FieldDef::required_object(profile))
            .with_field("connections", FieldDef::required_object(connections))
    }

    fn valid_user() -> Value {
        json!({
            "profile": {
                "username": "Zuma",
                "age": 17,
                "profilePicture": "https://thing.com/pfp.png"
            },
            "connections": {"friends": [], "blocked": []}
        })
    }

    #[test]
    fn test_valid_record_passes() {
        let validator = SchemaValidator::new(user_schema()).unwrap();
        assert!(validator.validate(&valid_user()).is_ok());
    }

    #[test]
    fn test_every_violation_reported() {
        let validator = SchemaValidator::new(user_schema()).unwrap();
        let record = json!({
            "profile": {
                "username": "Aa",
                "age": "seventeen",
                "nickname": "z"
            },
            "connections": {"friends": [1], "blocked": []}
        });

        let err = validator.validate(&record).unwrap_err();
        assert!(err.names_field("profile.username"));
        assert!(err.names_field("profile.age"));
        assert!(err.names_field("profile.profilePicture"));
        assert!(err.names_field("profile.nickname"));
        assert!(err.names_field("connections.friends[0]"));
        assert_eq!(err.violations().len(), 5);
    }

    #[test]
    fn test_reserved_fields_rejected_in_records() {
        let validator = SchemaValidator::new(user_schema()).unwrap();
        let mut record = valid_user();
        record["key"] = json!("user0");

        let err = validator.validate(&record).unwrap_err();
        assert!(err.names_field("key"));
        assert_eq!(err.violations().len(), 1);
    }

    #[test]
    fn test_batch_tags_record_index() {
        let validator = SchemaValidator::new(user_schema()).unwrap();
        let mut bad = valid_user();
        bad["profile"]["username"] = json!("a-very-long-username-indeed");

        let err = validator
            .validate_many(&[valid_user(), bad, valid_user()])
            .unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].record, Some(1));
        assert_eq!(err.violations()[0].field, "profile.username");
    }

    #[test]
    fn test_nullable_field() {
        let schema = Schema::new("notes", BTreeMap::new())
            .with_field("title", FieldDef::required_string())
            .with_field("body", FieldDef::required_string().nullable());
        let validator = SchemaValidator::new(schema).unwrap();

        assert!(validator.validate(&json!({"title": "t", "body": null})).is_ok());
        let err = validator
            .validate(&json!({"title": null, "body": null}))
            .unwrap_err();
        assert_eq!(err.details().unwrap().actual, "null");
    }

    #[test]
    fn test_pattern_constraint() {
        let schema = Schema::new("users", BTreeMap::new())
            .with_field("email", FieldDef::required_string().pattern("^[^@]+@[^@]+$"));
        let validator = SchemaValidator::new(schema).unwrap();

        assert!(validator.validate(&json!({"email": "a@b.c"})).is_ok());
        assert!(validator.validate(&json!({"email": "nope"})).is_err());
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let schema = Schema::new("users", BTreeMap::new())
            .with_field("email", FieldDef::required_string().pattern("(unclosed"));
        let err = SchemaValidator::new(schema).unwrap_err();
        assert_eq!(err.code(), crate::schema::SchemaErrorCode::InvalidPattern);
    }

    #[test]
    fn test_float_accepts_integers() {
        let schema = Schema::new("scores", BTreeMap::new())
            .with_field("score", FieldDef::required_float());
        let validator = SchemaValidator::new(schema).unwrap();

        assert!(validator.validate(&json!({"score": 100})).is_ok());
        assert!(validator.validate(&json!({"score": 99.5})).is_ok());
        assert!(validator.validate(&json!({"score": "99"})).is_err());
    }

    #[test]
    fn test_non_object_root() {
        let validator = SchemaValidator::new(user_schema()).unwrap();
        let err = validator.validate(&json!([1, 2])).unwrap_err();
        assert_eq!(err.details().unwrap().field, "$root");
    }

    #[test]
    fn test_value_violations_apply_constraints() {
        let username = FieldDef::required_string().length(3, 16).pattern("^[A-Za-z]+$");
        let schema = Schema::new("t", BTreeMap::new()).with_field("username", username.clone());
        let validator = SchemaValidator::new(schema).unwrap();

        let details = validator.value_violations(
            "profile.username",
            &json!("Aa"),
            &username.field_type,
            &username.constraints,
        );
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "profile.username");

        assert!(validator
            .value_violations("u", &json!("Zuma"), &username.field_type, &username.constraints)
            .is_empty());
        assert_eq!(
            validator
                .value_violations("u", &json!("Zu_1"), &username.field_type, &username.constraints)
                .len(),
            1
        );
    }

    #[test]
    fn test_value_conforms_ignores_constraints() {
        let username = FieldDef::required_string().length(3, 16);
        assert!(value_conforms(&username.field_type, &json!("Aa")));
        assert!(!value_conforms(&FieldType::Int, &json!(1.5)));
        assert!(value_conforms(
            &FieldType::Array {
                element_type: Box::new(FieldType::Int)
            },
            &json!([1, 2])
        ));
    }
}
