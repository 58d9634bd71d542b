//! Generic data value used for input documents and intermediate results.

use std::collections::BTreeMap;

use rhai::{Array, Dynamic, Map};

/// A JSON-like value tree. Mapping keys are kept sorted.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Parse a JSON document into a value tree.
    pub fn from_json_str(input: &str) -> serde_json::Result<Value> {
        serde_json::from_str::<serde_json::Value>(input).map(Value::from)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Length as seen by `len()`: sequences, strings (bytes) and mappings.
    /// Every other type has no length.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.len()),
            Value::String(s) => Some(s.len()),
            Value::Object(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Null, false, zero, the empty string and empty collections are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    /// Best-effort numeric coercion used by scalar addition.
    /// Strings must hold an integer literal; anything else is zero.
    pub fn coerce_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => s.parse::<i64>().map(|n| n as f64).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if is_integral(*n) {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Convert into a Rhai value. Integral numbers become `INT` so that
    /// comparisons against integer literals behave as expected.
    pub fn to_dynamic(&self) -> Dynamic {
        match self {
            Value::Null => Dynamic::UNIT,
            Value::Bool(b) => Dynamic::from_bool(*b),
            Value::Number(n) => {
                if is_integral(*n) {
                    Dynamic::from_int(*n as i64)
                } else {
                    Dynamic::from_float(*n)
                }
            }
            Value::String(s) => Dynamic::from(s.clone()),
            Value::Array(items) => {
                let array: Array = items.iter().map(Value::to_dynamic).collect();
                Dynamic::from_array(array)
            }
            Value::Object(map) => {
                let object: Map = map
                    .iter()
                    .map(|(k, v)| (k.as_str().into(), v.to_dynamic()))
                    .collect();
                Dynamic::from_map(object)
            }
        }
    }
}

pub(crate) fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_sorts_object_keys() {
        let value = Value::from(json!({"b": 1, "a": [true, null, "x"]}));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(
            value.as_object().unwrap()["a"],
            Value::Array(vec![Value::Bool(true), Value::Null, Value::from("x")])
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(!Value::Object(BTreeMap::new()).is_truthy());
        assert!(Value::from(-1.5).is_truthy());
        assert!(Value::from("0").is_truthy());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(Value::from(2.5).coerce_number(), 2.5);
        assert_eq!(Value::from("41").coerce_number(), 41.0);
        assert_eq!(Value::from("4.5").coerce_number(), 0.0);
        assert_eq!(Value::Bool(true).coerce_number(), 0.0);
    }

    #[test]
    fn test_to_dynamic_uses_int_for_integral_numbers() {
        assert_eq!(Value::from(3.0).to_dynamic().as_int(), Ok(3));
        assert_eq!(Value::from(0.5).to_dynamic().as_float(), Ok(0.5));
        assert!(Value::Null.to_dynamic().is_unit());
        let arr = Value::from(json!([1, 2])).to_dynamic();
        assert!(arr.is_array());
        let map = Value::from(json!({"k": "v"})).to_dynamic();
        assert!(map.is_map());
    }

    #[test]
    fn test_to_json_is_compact_and_integral() {
        let value = Value::from(json!({"n": 1.0, "f": 0.25, "s": [1, "a"]}));
        assert_eq!(value.to_json().to_string(), r#"{"f":0.25,"n":1,"s":[1,"a"]}"#);
    }
}
