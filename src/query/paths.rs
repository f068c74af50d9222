//! # Path Table
//!
//! Flattens a schema into its dotted leaf paths. Each leaf gets a category
//! that decides which query operators and update actions apply to it.
//! Nested objects are never targets themselves, only their leaves.

use std::collections::BTreeMap;

use serde_json::Value;

use super::errors::PathViolation;
use super::filter::{Condition, Query, QueryOperator};
use crate::schema::{
    value_conforms, Constraints, FieldDef, FieldType, Schema, SchemaValidator, KEY_FIELD,
};
use crate::update::{Action, UpdateValue, Updates};

/// Leaf category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    Numeric,
    Textual,
    Array,
    Other,
}

const NUMERIC_OPERATORS: &[QueryOperator] = &[
    QueryOperator::Eq,
    QueryOperator::Gt,
    QueryOperator::Lt,
    QueryOperator::Gte,
    QueryOperator::Lte,
    QueryOperator::Range,
];

const TEXTUAL_OPERATORS: &[QueryOperator] = &[
    QueryOperator::Eq,
    QueryOperator::Prefix,
    QueryOperator::Contains,
    QueryOperator::NotContains,
];

const ARRAY_OPERATORS: &[QueryOperator] = &[
    QueryOperator::Eq,
    QueryOperator::Contains,
    QueryOperator::NotContains,
];

const OTHER_OPERATORS: &[QueryOperator] = &[QueryOperator::Eq];

impl FieldCategory {
    pub fn of(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Int | FieldType::Float => FieldCategory::Numeric,
            FieldType::String => FieldCategory::Textual,
            FieldType::Array { .. } => FieldCategory::Array,
            FieldType::Bool | FieldType::Object { .. } => FieldCategory::Other,
        }
    }

    /// Legal query operators, equality first
    pub fn operators(&self) -> &'static [QueryOperator] {
        match self {
            FieldCategory::Numeric => NUMERIC_OPERATORS,
            FieldCategory::Textual => TEXTUAL_OPERATORS,
            FieldCategory::Array => ARRAY_OPERATORS,
            FieldCategory::Other => OTHER_OPERATORS,
        }
    }

    pub fn allows(&self, operator: QueryOperator) -> bool {
        self.operators().contains(&operator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldCategory::Numeric => "numeric",
            FieldCategory::Textual => "textual",
            FieldCategory::Array => "array",
            FieldCategory::Other => "other",
        }
    }
}

/// Typing information for one leaf path
#[derive(Debug, Clone, PartialEq)]
pub struct PathInfo {
    pub field_type: FieldType,
    pub category: FieldCategory,
    pub nullable: bool,
    /// Constraints a value set on this leaf must satisfy
    pub constraints: Constraints,
}

impl PathInfo {
    fn new(field_type: FieldType, nullable: bool, constraints: Constraints) -> Self {
        Self {
            category: FieldCategory::of(&field_type),
            field_type,
            nullable,
            constraints,
        }
    }

    /// Element type for array leaves
    pub fn element_type(&self) -> Option<&FieldType> {
        match &self.field_type {
            FieldType::Array { element_type } => Some(element_type),
            _ => None,
        }
    }
}

/// Flat `path -> PathInfo` table for a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathTable {
    paths: BTreeMap<String, PathInfo>,
}

impl PathTable {
    pub fn from_schema(schema: &Schema) -> Self {
        let mut paths = BTreeMap::new();
        // The storage key is queryable on every base.
        paths.insert(
            KEY_FIELD.to_string(),
            PathInfo::new(FieldType::String, false, Constraints::default()),
        );
        collect(&schema.fields, None, &mut paths);
        Self { paths }
    }

    pub fn get(&self, path: &str) -> Option<&PathInfo> {
        self.paths.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathInfo)> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Check one condition against the table
    pub fn check_condition(&self, condition: &Condition) -> Result<(), PathViolation> {
        let key = condition.key();
        let info = self
            .get(&condition.path)
            .ok_or_else(|| PathViolation::unknown_path(&key))?;

        if !info.category.allows(condition.operator) {
            return Err(PathViolation::new(
                &key,
                format!(
                    "operator '{}' is not allowed on {} field",
                    condition.operator.as_str(),
                    info.category.as_str()
                ),
            ));
        }

        if operand_fits(info, condition.operator, &condition.value) {
            Ok(())
        } else {
            Err(PathViolation::new(
                &key,
                format!(
                    "operand {} does not fit {} field",
                    condition.value,
                    info.field_type.type_name()
                ),
            ))
        }
    }

    /// Check every condition of every alternative
    pub fn check_query(&self, query: &Query) -> Result<(), Vec<PathViolation>> {
        let violations: Vec<_> = query
            .conditions()
            .filter_map(|c| self.check_condition(c).err())
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Check every update entry: the path must be a leaf, an action must
    /// fit its type and a plain value must pass the leaf's type and
    /// constraints as `validator` checks them on write.
    pub fn check_updates(
        &self,
        updates: &Updates,
        validator: &SchemaValidator,
    ) -> Result<(), Vec<PathViolation>> {
        let violations: Vec<_> = updates
            .iter()
            .filter_map(|(path, value)| self.check_update(path, value, validator).err())
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check_update(
        &self,
        path: &str,
        value: &UpdateValue,
        validator: &SchemaValidator,
    ) -> Result<(), PathViolation> {
        if path == KEY_FIELD {
            return Err(PathViolation::new(path, "the record key cannot be updated"));
        }
        let info = self
            .get(path)
            .ok_or_else(|| PathViolation::unknown_path(path))?;

        match value {
            UpdateValue::Set(Value::Null) if info.nullable => Ok(()),
            UpdateValue::Set(v) => {
                let details =
                    validator.value_violations(path, v, &info.field_type, &info.constraints);
                if details.is_empty() {
                    Ok(())
                } else {
                    let reasons: Vec<_> = details
                        .iter()
                        .map(|d| format!("expected {}, got {}", d.expected, d.actual))
                        .collect();
                    Err(PathViolation::new(path, reasons.join("; ")))
                }
            }
            UpdateValue::Action(Action::Trim) => Ok(()),
            UpdateValue::Action(Action::Increment(delta)) if !delta.is_finite() => Err(
                PathViolation::new(path, "increment delta must be a finite number"),
            ),
            UpdateValue::Action(Action::Increment(delta)) => match &info.field_type {
                FieldType::Int if delta.as_i64().is_none() => Err(PathViolation::new(
                    path,
                    "increment of an int field needs an integral delta",
                )),
                FieldType::Int | FieldType::Float => Ok(()),
                _ => Err(not_applicable(path, "increment", info)),
            },
            UpdateValue::Action(action) => {
                let operand = match action {
                    Action::Append(v) | Action::Prepend(v) => v,
                    _ => return Ok(()),
                };
                let kind = action.kind().as_str();
                let element_type = info
                    .element_type()
                    .ok_or_else(|| not_applicable(path, kind, info))?;
                if elements_conform(element_type, operand) {
                    Ok(())
                } else {
                    Err(PathViolation::new(
                        path,
                        format!(
                            "{} operand {} does not match element type {}",
                            kind,
                            operand,
                            element_type.type_name()
                        ),
                    ))
                }
            }
        }
    }
}

fn collect(
    fields: &BTreeMap<String, FieldDef>,
    prefix: Option<&str>,
    paths: &mut BTreeMap<String, PathInfo>,
) {
    for (name, def) in fields {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name.clone(),
        };
        match &def.field_type {
            FieldType::Object { fields } => collect(fields, Some(path.as_str()), paths),
            other => {
                let info = PathInfo::new(other.clone(), def.nullable, def.constraints.clone());
                paths.insert(path, info);
            }
        }
    }
}

fn not_applicable(path: &str, action: &str, info: &PathInfo) -> PathViolation {
    PathViolation::new(
        path,
        format!(
            "{} is not applicable to {} field",
            action,
            info.field_type.type_name()
        ),
    )
}

/// A single element, or a sequence of elements, of the given type
fn elements_conform(element_type: &FieldType, value: &Value) -> bool {
    match value {
        Value::Array(items) if !matches!(element_type, FieldType::Array { .. }) => {
            items.iter().all(|item| value_conforms(element_type, item))
        }
        other => value_conforms(element_type, other),
    }
}

fn operand_fits(info: &PathInfo, operator: QueryOperator, operand: &Value) -> bool {
    match operator {
        // null equality matches records where the field is missing
        QueryOperator::Eq => operand.is_null() || value_conforms(&info.field_type, operand),
        QueryOperator::Gt | QueryOperator::Lt | QueryOperator::Gte | QueryOperator::Lte => {
            operand.is_number()
        }
        QueryOperator::Range => match operand.as_array().map(Vec::as_slice) {
            Some([lo, hi]) => lo.is_number() && hi.is_number(),
            _ => false,
        },
        QueryOperator::Prefix => operand.is_string(),
        QueryOperator::Contains | QueryOperator::NotContains => match info.element_type() {
            Some(element_type) => value_conforms(element_type, operand),
            None => operand.is_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryMap;
    use crate::schema::FieldDef;
    use crate::update::Util;
    use serde_json::json;

    fn user_schema() -> Schema {
        let profile = BTreeMap::from([
            ("username".to_string(), FieldDef::required_string().length(3, 16)),
            ("age".to_string(), FieldDef::required_int()),
            ("score".to_string(), FieldDef::optional_float().nullable()),
            ("verified".to_string(), FieldDef::optional_bool()),
        ]);
        let connections = BTreeMap::from([
            ("friends".to_string(), FieldDef::required_array(FieldType::String)),
            ("blocked".to_string(), FieldDef::required_array(FieldType::String)),
        ]);
        Schema::new("users", BTreeMap::new())
            .with_field("profile", FieldDef::required_object(profile))
            .with_field("connections", FieldDef::required_object(connections))
    }

    #[test]
    fn test_leaf_paths_and_categories() {
        let table = PathTable::from_schema(&user_schema());
        assert_eq!(table.get("profile.age").unwrap().category, FieldCategory::Numeric);
        assert_eq!(table.get("profile.username").unwrap().category, FieldCategory::Textual);
        assert_eq!(table.get("connections.friends").unwrap().category, FieldCategory::Array);
        assert_eq!(table.get("profile.verified").unwrap().category, FieldCategory::Other);
        assert_eq!(table.get("key").unwrap().category, FieldCategory::Textual);
        // nested objects are not targets
        assert!(!table.contains("profile"));
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn test_operator_sets() {
        assert_eq!(FieldCategory::Numeric.operators().len(), 6);
        assert!(FieldCategory::Textual.allows(QueryOperator::Prefix));
        assert!(!FieldCategory::Array.allows(QueryOperator::Prefix));
        assert!(!FieldCategory::Numeric.allows(QueryOperator::Contains));
        assert_eq!(FieldCategory::Other.operators(), &[QueryOperator::Eq]);
    }

    #[test]
    fn test_check_query() {
        let table = PathTable::from_schema(&user_schema());
        let ok = Query::from(
            QueryMap::new()
                .range("profile.age", 10, 20)
                .prefix("profile.username", "Zu")
                .contains("connections.friends", "bob"),
        );
        assert!(table.check_query(&ok).is_ok());

        let bad = Query::from(QueryMap::new().prefix("profile.age", "1"))
            .or(QueryMap::new().eq("profile", json!({})))
            .or(QueryMap::new().contains("connections.friends", 3));
        let violations = table.check_query(&bad).unwrap_err();
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].key, "profile.age?pfx");
        assert_eq!(violations[1].key, "profile");
    }

    #[test]
    fn test_check_updates() {
        let table = PathTable::from_schema(&user_schema());
        let validator = SchemaValidator::new(user_schema()).unwrap();
        let util = Util;

        let ok = Updates::new()
            .set("profile.score", Value::Null)
            .apply("profile.age", util.increment(1))
            .apply("connections.friends", util.append(vec!["a", "b"]))
            .apply("profile.verified", util.trim());
        assert!(table.check_updates(&ok, &validator).is_ok());

        let bad = Updates::new()
            .apply("profile.username", util.increment(1))
            .apply("profile.age", util.increment(0.5))
            .apply("connections.blocked", util.prepend(7))
            .set("profile.verified", "yes")
            .set("key", "other");
        let violations = table.check_updates(&bad, &validator).unwrap_err();
        assert_eq!(violations.len(), 5);
        assert!(violations.iter().any(|v| v.key == "profile.username"));
        assert!(violations.iter().any(|v| v.key == "key"));
    }

    #[test]
    fn test_set_applies_leaf_constraints() {
        let table = PathTable::from_schema(&user_schema());
        let validator = SchemaValidator::new(user_schema()).unwrap();

        let short = Updates::new().set("profile.username", "Aa");
        let violations = table.check_updates(&short, &validator).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].key, "profile.username");

        let long = Updates::new().set("profile.username", "y".repeat(17));
        assert!(table.check_updates(&long, &validator).is_err());

        let fits = Updates::new().set("profile.username", "Zuma206");
        assert!(table.check_updates(&fits, &validator).is_ok());

        let null = Updates::new().set("profile.username", Value::Null);
        assert!(table.check_updates(&null, &validator).is_err());
    }

    #[test]
    fn test_increment_delta_must_fit_field() {
        let table = PathTable::from_schema(&user_schema());
        let validator = SchemaValidator::new(user_schema()).unwrap();
        let util = Util;

        let integral = Updates::new().apply("profile.age", util.increment(2.0));
        assert!(table.check_updates(&integral, &validator).is_ok());

        for delta in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let updates = Updates::new()
                .apply("profile.age", util.increment(delta))
                .apply("profile.score", util.increment(delta));
            let violations = table.check_updates(&updates, &validator).unwrap_err();
            assert_eq!(violations.len(), 2);
            assert!(violations.iter().all(|v| v.reason.contains("finite")));
        }

        let huge = Updates::new().apply("profile.age", util.increment(1e300));
        assert!(table.check_updates(&huge, &validator).is_err());
    }
}
