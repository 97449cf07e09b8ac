//! JSON <-> prune Value conversion utilities

use crate::Value;

/// Convert serde_json::Value to a prune Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert a prune Value to serde_json::Value. Records become plain objects
/// keyed by their declared field names; non-finite floats become null.
pub fn value_to_json(v: Value) -> serde_json::Value {
    serde_json::to_value(&v).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integers_stay_integers() {
        assert_eq!(json_to_value(json!(3)), Value::Integer(3));
        assert_eq!(json_to_value(json!(3.5)), Value::Float(3.5));
    }

    #[test]
    fn test_non_finite_floats_become_null() {
        assert_eq!(value_to_json(Value::Float(f64::NAN)), serde_json::Value::Null);
    }
}
