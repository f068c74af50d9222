//! # Query Expressions
//!
//! A query is one condition map, or an ordered list of maps OR'ed together.
//! Each condition key is a dotted field path with an optional operator
//! suffix (`profile.age?gte`). On the wire a single map is a JSON object and
//! an OR list is a JSON array of objects.

use std::cmp::Ordering;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};

/// Separator between a field path and its operator suffix
pub const OPERATOR_SEPARATOR: char = '?';

/// Query operators understood by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryOperator {
    /// Equals (no suffix)
    Eq,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
    /// String prefix
    Prefix,
    /// Inclusive numeric range `[lo, hi]`
    Range,
    /// Substring or array element containment
    Contains,
    /// Negated containment
    NotContains,
}

impl QueryOperator {
    /// Get the key suffix, `None` for equality
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            QueryOperator::Eq => None,
            QueryOperator::Gt => Some("gt"),
            QueryOperator::Lt => Some("lt"),
            QueryOperator::Gte => Some("gte"),
            QueryOperator::Lte => Some("lte"),
            QueryOperator::Prefix => Some("pfx"),
            QueryOperator::Range => Some("r"),
            QueryOperator::Contains => Some("contains"),
            QueryOperator::NotContains => Some("not_contains"),
        }
    }

    /// Parse a key suffix
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(QueryOperator::Gt),
            "lt" => Some(QueryOperator::Lt),
            "gte" => Some(QueryOperator::Gte),
            "lte" => Some(QueryOperator::Lte),
            "pfx" => Some(QueryOperator::Prefix),
            "r" => Some(QueryOperator::Range),
            "contains" => Some(QueryOperator::Contains),
            "not_contains" => Some(QueryOperator::NotContains),
            _ => None,
        }
    }

    /// Name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        self.suffix().unwrap_or("eq")
    }
}

/// A single `path?op = value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Dotted field path
    pub path: String,
    /// Comparison operator
    pub operator: QueryOperator,
    /// Value to compare against
    pub value: Value,
}

impl Condition {
    /// Create a new condition
    pub fn new(path: impl Into<String>, operator: QueryOperator, value: Value) -> Self {
        Self {
            path: path.into(),
            operator,
            value,
        }
    }

    /// Parse a wire key (`path` or `path?op`) and its operand
    pub fn parse(key: &str, value: Value) -> QueryResult<Self> {
        let (path, operator) = match key.split_once(OPERATOR_SEPARATOR) {
            Some((path, suffix)) => {
                let op = QueryOperator::from_suffix(suffix).ok_or_else(|| {
                    QueryError::UnknownOperator {
                        key: key.to_string(),
                        suffix: suffix.to_string(),
                    }
                })?;
                (path, op)
            }
            None => (key, QueryOperator::Eq),
        };

        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(QueryError::InvalidKey(key.to_string()));
        }

        Ok(Self::new(path, operator, value))
    }

    /// Wire key for this condition
    pub fn key(&self) -> String {
        match self.operator.suffix() {
            Some(suffix) => format!("{}{}{}", self.path, OPERATOR_SEPARATOR, suffix),
            None => self.path.clone(),
        }
    }

    /// Check if a record matches this condition
    pub fn matches(&self, record: &Value) -> bool {
        let field_value = match lookup(record, &self.path) {
            Some(v) => v,
            None => {
                return match self.operator {
                    QueryOperator::Eq => self.value.is_null(),
                    QueryOperator::NotContains => true,
                    _ => false,
                }
            }
        };

        match self.operator {
            QueryOperator::Eq => field_value == &self.value,
            QueryOperator::Gt => compare(field_value, &self.value) == Some(Ordering::Greater),
            QueryOperator::Gte => matches!(
                compare(field_value, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            QueryOperator::Lt => compare(field_value, &self.value) == Some(Ordering::Less),
            QueryOperator::Lte => matches!(
                compare(field_value, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            QueryOperator::Prefix => match (field_value.as_str(), self.value.as_str()) {
                (Some(s), Some(prefix)) => s.starts_with(prefix),
                _ => false,
            },
            QueryOperator::Range => match self.value.as_array().map(Vec::as_slice) {
                Some([lo, hi]) => {
                    matches!(
                        compare(field_value, lo),
                        Some(Ordering::Greater | Ordering::Equal)
                    ) && matches!(
                        compare(field_value, hi),
                        Some(Ordering::Less | Ordering::Equal)
                    )
                }
                _ => false,
            },
            QueryOperator::Contains => contains(field_value, &self.value).unwrap_or(false),
            QueryOperator::NotContains => contains(field_value, &self.value)
                .map(|found| !found)
                .unwrap_or(false),
        }
    }
}

/// Resolve a dotted path inside a record
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.as_object()?.get(segment))
}

/// Order two JSON values of the same scalar kind
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// `None` when containment is meaningless for the field's type
fn contains(haystack: &Value, needle: &Value) -> Option<bool> {
    match haystack {
        Value::String(s) => needle.as_str().map(|n| s.contains(n)),
        Value::Array(items) => Some(items.contains(needle)),
        _ => None,
    }
}

/// A set of conditions combined with AND logic
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMap {
    pub conditions: Vec<Condition>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary condition
    pub fn with(mut self, path: impl Into<String>, operator: QueryOperator, value: Value) -> Self {
        self.conditions.push(Condition::new(path, operator, value));
        self
    }

    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::Eq, value.into())
    }

    pub fn gt(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::Gt, value.into())
    }

    pub fn gte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::Gte, value.into())
    }

    pub fn lt(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::Lt, value.into())
    }

    pub fn lte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::Lte, value.into())
    }

    pub fn prefix(self, path: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.with(path, QueryOperator::Prefix, Value::String(prefix.into()))
    }

    pub fn range(self, path: impl Into<String>, lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::Range, Value::Array(vec![lo.into(), hi.into()]))
    }

    pub fn contains(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::Contains, value.into())
    }

    pub fn not_contains(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, QueryOperator::NotContains, value.into())
    }

    /// Check if a record matches all conditions
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Wire representation: one JSON object
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .conditions
            .iter()
            .map(|c| (c.key(), c.value.clone()))
            .collect();
        Value::Object(map)
    }

    /// Parse a wire object
    pub fn from_map(map: &Map<String, Value>) -> QueryResult<Self> {
        let conditions = map
            .iter()
            .map(|(key, value)| Condition::parse(key, value.clone()))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Self { conditions })
    }
}

/// A full query: alternatives OR'ed together
///
/// An empty query matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub alternatives: Vec<QueryMap>,
}

impl Query {
    /// Query matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Logical OR across the given maps
    pub fn any(alternatives: Vec<QueryMap>) -> Self {
        Self { alternatives }
    }

    /// Add another OR'ed alternative
    pub fn or(mut self, alternative: QueryMap) -> Self {
        self.alternatives.push(alternative);
        self
    }

    /// Iterate every condition across all alternatives
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.alternatives.iter().flat_map(|m| m.conditions.iter())
    }

    /// Check if a record matches any alternative
    pub fn matches(&self, record: &Value) -> bool {
        self.alternatives.is_empty() || self.alternatives.iter().any(|m| m.matches(record))
    }

    /// Wire representation
    pub fn to_value(&self) -> Value {
        match self.alternatives.as_slice() {
            [single] => single.to_value(),
            many => Value::Array(many.iter().map(QueryMap::to_value).collect()),
        }
    }

    /// Parse the wire representation
    pub fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Object(map) => Ok(Self::from(QueryMap::from_map(map)?)),
            Value::Array(items) => {
                let alternatives = items
                    .iter()
                    .map(|item| match item {
                        Value::Object(map) => QueryMap::from_map(map),
                        other => Err(QueryError::NotAnObject(other.to_string())),
                    })
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(Self { alternatives })
            }
            other => Err(QueryError::NotAnObject(other.to_string())),
        }
    }
}

impl From<QueryMap> for Query {
    fn from(map: QueryMap) -> Self {
        Self {
            alternatives: vec![map],
        }
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Query::from_value(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keys() {
        let cond = Condition::parse("profile.age?gte", json!(18)).unwrap();
        assert_eq!(cond.path, "profile.age");
        assert_eq!(cond.operator, QueryOperator::Gte);
        assert_eq!(cond.key(), "profile.age?gte");

        let cond = Condition::parse("name", json!("Zuma")).unwrap();
        assert_eq!(cond.operator, QueryOperator::Eq);
        assert_eq!(cond.key(), "name");
    }

    #[test]
    fn test_parse_rejects_unknown_suffix() {
        let err = Condition::parse("age?between", json!(1)).unwrap_err();
        assert!(matches!(err, QueryError::UnknownOperator { .. }));
        assert!(Condition::parse("a..b", json!(1)).is_err());
        assert!(Condition::parse("?gt", json!(1)).is_err());
    }

    #[test]
    fn test_comparison_operators() {
        let record = json!({"profile": {"age": 17}});
        assert!(QueryMap::new().gt("profile.age", 16).matches(&record));
        assert!(!QueryMap::new().gt("profile.age", 17).matches(&record));
        assert!(QueryMap::new().gte("profile.age", 17).matches(&record));
        assert!(QueryMap::new().lt("profile.age", 18).matches(&record));
        assert!(QueryMap::new().lte("profile.age", 17).matches(&record));
        assert!(QueryMap::new().range("profile.age", 5, 17).matches(&record));
        assert!(!QueryMap::new().range("profile.age", 18, 20).matches(&record));
    }

    #[test]
    fn test_string_operators() {
        let record = json!({"name": "Johnson"});
        assert!(QueryMap::new().prefix("name", "John").matches(&record));
        assert!(!QueryMap::new().prefix("name", "son").matches(&record));
        assert!(QueryMap::new().contains("name", "hns").matches(&record));
        assert!(QueryMap::new().not_contains("name", "xyz").matches(&record));
    }

    #[test]
    fn test_array_containment() {
        let record = json!({"connections": {"friends": ["ann", "bob"]}});
        assert!(QueryMap::new()
            .contains("connections.friends", "bob")
            .matches(&record));
        assert!(QueryMap::new()
            .not_contains("connections.friends", "eve")
            .matches(&record));
        assert!(!QueryMap::new()
            .contains("connections.friends", "eve")
            .matches(&record));
    }

    #[test]
    fn test_or_semantics() {
        let query = Query::from(QueryMap::new().eq("name", "a")).or(QueryMap::new().eq("name", "b"));
        assert!(query.matches(&json!({"name": "a"})));
        assert!(query.matches(&json!({"name": "b"})));
        assert!(!query.matches(&json!({"name": "c"})));
        assert!(Query::all().matches(&json!({"name": "c"})));
    }

    #[test]
    fn test_wire_shape() {
        let single = Query::from(QueryMap::new().range("number", 5, 10));
        assert_eq!(single.to_value(), json!({"number?r": [5, 10]}));

        let or = Query::any(vec![
            QueryMap::new().eq("a", 1),
            QueryMap::new().prefix("b", "x"),
        ]);
        assert_eq!(or.to_value(), json!([{"a": 1}, {"b?pfx": "x"}]));

        let parsed: Query = serde_json::from_value(json!([{"a": 1}, {"b?pfx": "x"}])).unwrap();
        assert_eq!(parsed, or);
    }

    #[test]
    fn test_from_value_rejects_scalars() {
        assert!(Query::from_value(&json!(42)).is_err());
        assert!(Query::from_value(&json!([{"a": 1}, 2])).is_err());
    }
}
