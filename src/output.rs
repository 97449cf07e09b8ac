//! JSON text for projected values.
//!
//! [`Value`] implements [`Serialize`], so projected output can be written
//! with any serde format. [`to_json`] and [`to_json_pretty`] cover the common
//! case. Object keys are sorted, so output is deterministic. Non-finite
//! floats are written as `null`. A [`Record`](crate::value::Record) that was
//! never projected is written as a plain object keyed by its declared field
//! names.
//!
//! ```
//! use prune_lang::Value;
//! use prune_lang::output::{to_json, to_json_pretty};
//!
//! let value = Value::Array(vec![Value::Integer(1), Value::from("two")]);
//!
//! assert_eq!(to_json(&value), r#"[1,"two"]"#);
//! assert_eq!(to_json_pretty(&value), "[\n  1,\n  \"two\"\n]");
//! ```

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::value::Value;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Float(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Float(_) => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(fields) => serializer.collect_map(fields),
            Value::Record(record) => {
                let mut map = serializer.serialize_map(Some(record.fields.len()))?;
                for (name, value) in &record.fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

/// Compact JSON.
///
/// ```
/// use prune_lang::Value;
/// use prune_lang::output::to_json;
/// use std::collections::BTreeMap;
///
/// let mut obj = BTreeMap::new();
/// obj.insert("name".to_string(), Value::from("Alice"));
/// obj.insert("age".to_string(), Value::Integer(30));
///
/// assert_eq!(to_json(&Value::Object(obj)), r#"{"age":30,"name":"Alice"}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    // Keys are always strings, so serialization cannot fail
    serde_json::to_string(value).unwrap_or_default()
}

/// JSON indented by two spaces
pub fn to_json_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    #[test]
    fn test_strings_are_escaped() {
        assert_eq!(to_json(&Value::from("a\"b\n")), r#""a\"b\n""#);
    }

    #[test]
    fn test_non_finite_floats_are_null() {
        assert_eq!(to_json(&Value::Float(f64::INFINITY)), "null");
    }

    #[test]
    fn test_unprojected_records_use_declared_names() {
        let record: Value = Record::new("User").with("id", 1).with("login", "ada").into();
        assert_eq!(to_json(&record), r#"{"id":1,"login":"ada"}"#);
    }

    #[test]
    fn test_empty_containers() {
        let value = Value::Array(vec![Value::Array(vec![]), Value::Object(Default::default())]);
        assert_eq!(to_json_pretty(&value), "[\n  [],\n  {}\n]");
    }
}
