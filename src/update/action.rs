//! Update actions
//!
//! A closed set of atomic field mutations interpreted by the store. Plain
//! values in an update map mean "set"; everything else is an [`Action`].

use serde_json::{Number, Value};

/// Operation carried by an update entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Replace the value (plain values in an update map)
    Set,
    /// Remove the field
    Trim,
    /// Add a signed delta to a number
    Increment,
    /// Insert at the tail of an array
    Append,
    /// Insert at the head of an array
    Prepend,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Set => "set",
            ActionKind::Trim => "trim",
            ActionKind::Increment => "increment",
            ActionKind::Append => "append",
            ActionKind::Prepend => "prepend",
        }
    }
}

/// Signed increment amount
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    Int(i64),
    Float(f64),
}

impl Delta {
    /// True when the delta has no fractional part
    pub fn is_integral(&self) -> bool {
        match self {
            Delta::Int(_) => true,
            Delta::Float(f) => f.fract() == 0.0,
        }
    }

    /// False for NaN and infinite float deltas
    pub fn is_finite(&self) -> bool {
        match self {
            Delta::Int(_) => true,
            Delta::Float(f) => f.is_finite(),
        }
    }

    /// The delta as an integer, if it is integral and in range
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Delta::Int(i) => Some(*i),
            Delta::Float(f) => {
                let in_range = *f >= i64::MIN as f64 && *f < i64::MAX as f64;
                (self.is_integral() && in_range).then(|| *f as i64)
            }
        }
    }

    /// JSON number for the delta; non-finite floats become null
    pub fn to_value(&self) -> Value {
        match self {
            Delta::Int(i) => Value::Number((*i).into()),
            Delta::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        }
    }

    /// Add the delta to a stored number.
    ///
    /// Integer arithmetic is kept when the stored number is an integer, the
    /// delta is integral and the sum does not overflow. Returns `None` if
    /// `current` is not a number.
    pub fn apply(&self, current: &Value) -> Option<Value> {
        let current = match current {
            Value::Number(n) => n,
            _ => return None,
        };
        if let (Some(d), Some(c)) = (self.as_i64(), current.as_i64()) {
            if let Some(sum) = c.checked_add(d) {
                return Some(Value::Number(sum.into()));
            }
        }
        let d = match self {
            Delta::Int(i) => *i as f64,
            Delta::Float(f) => *f,
        };
        Number::from_f64(current.as_f64()? + d).map(Value::Number)
    }
}

impl From<i64> for Delta {
    fn from(v: i64) -> Self {
        Delta::Int(v)
    }
}

impl From<i32> for Delta {
    fn from(v: i32) -> Self {
        Delta::Int(v.into())
    }
}

impl From<u32> for Delta {
    fn from(v: u32) -> Self {
        Delta::Int(v.into())
    }
}

impl From<f64> for Delta {
    fn from(v: f64) -> Self {
        Delta::Float(v)
    }
}

/// An immutable update action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Remove the field from the stored record
    Trim,
    /// Atomically add a delta to a numeric field
    Increment(Delta),
    /// Append an element, or every element of a sequence, to an array field
    Append(Value),
    /// Prepend an element, or every element of a sequence, to an array field
    Prepend(Value),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Trim => ActionKind::Trim,
            Action::Increment(_) => ActionKind::Increment,
            Action::Append(_) => ActionKind::Append,
            Action::Prepend(_) => ActionKind::Prepend,
        }
    }

    /// Operand of the action, `None` for trim
    pub fn value(&self) -> Option<Value> {
        match self {
            Action::Trim => None,
            Action::Increment(delta) => Some(delta.to_value()),
            Action::Append(v) | Action::Prepend(v) => Some(v.clone()),
        }
    }
}

/// Action factories exposed as `base.util()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Util;

impl Util {
    /// Removes an attribute from the record.
    pub fn trim(&self) -> Action {
        Action::Trim
    }

    /// Increments a numeric attribute by a positive or negative delta.
    pub fn increment(&self, delta: impl Into<Delta>) -> Action {
        Action::Increment(delta.into())
    }

    /// Appends to a list. The value can be a single element or a list.
    pub fn append(&self, value: impl Into<Value>) -> Action {
        Action::Append(value.into())
    }

    /// Prepends to a list. The value can be a single element or a list.
    pub fn prepend(&self, value: impl Into<Value>) -> Action {
        Action::Prepend(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factories() {
        let util = Util;
        assert_eq!(util.trim().kind(), ActionKind::Trim);
        assert_eq!(util.trim().value(), None);
        assert_eq!(util.increment(-2).value(), Some(json!(-2)));
        assert_eq!(util.append("x").kind(), ActionKind::Append);
        assert_eq!(util.prepend(vec!["a", "b"]).value(), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_delta_keeps_integers() {
        assert_eq!(Delta::Int(1).apply(&json!(17)), Some(json!(18)));
        assert_eq!(Delta::Int(-20).apply(&json!(17)), Some(json!(-3)));
        assert_eq!(Delta::Float(0.5).apply(&json!(1)), Some(json!(1.5)));
        assert_eq!(Delta::Int(1).apply(&json!(1.5)), Some(json!(2.5)));
        assert_eq!(Delta::Int(1).apply(&json!("1")), None);
    }

    #[test]
    fn test_integral_float_delta_keeps_integers() {
        assert_eq!(Delta::Float(2.0).apply(&json!(17)), Some(json!(19)));
        assert!(Delta::Float(2.0).apply(&json!(17)).unwrap().is_i64());
        assert_eq!(Delta::Float(-1.0).apply(&json!(1.5)), Some(json!(0.5)));
        assert_eq!(Delta::Float(1e300).as_i64(), None);
    }

    #[test]
    fn test_non_finite_delta() {
        assert!(!Delta::Float(f64::NAN).is_finite());
        assert!(!Delta::Float(f64::INFINITY).is_finite());
        assert!(Delta::Float(0.5).is_finite());
        assert_eq!(Delta::Float(f64::NAN).as_i64(), None);
    }

    #[test]
    fn test_delta_overflow_falls_back_to_float() {
        let result = Delta::Int(1).apply(&json!(i64::MAX)).unwrap();
        assert!(result.is_f64());
    }

    #[test]
    fn test_integral() {
        assert!(Delta::Int(3).is_integral());
        assert!(Delta::Float(2.0).is_integral());
        assert!(!Delta::Float(2.5).is_integral());
    }
}
