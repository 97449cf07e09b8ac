use std::collections::BTreeMap;

/// A value the projection engine walks.
///
/// Every JSON shape, with integers kept apart from floats, plus [`Record`]:
/// an object whose visible properties come from a registered type schema
/// (see [`crate::introspect`]). Object keys are sorted, so projected output is
/// deterministic.
///
/// # Examples
///
/// ```
/// use prune_lang::{Record, Value};
///
/// let tags = Value::from(vec![Value::from("admin"), Value::from("ops")]);
/// let user: Value = Record::new("User")
///     .with("id", 7)
///     .with("score", 0.5)
///     .with("tags", tags)
///     .into();
///
/// assert_eq!(user.type_name(), "record");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Float(f64),
    Integer(i64),
    String(String),

    /// Projected element-wise with the frontier of its container
    Array(Vec<Value>),

    /// Untyped object; every key is a candidate field
    Object(BTreeMap<String, Value>),

    /// Typed object whose visible properties come from its type schema
    Record(Record),
}

/// An introspectable object.
///
/// Fields are keyed by their declared property name. Projection emits them
/// under their external name, which a schema may rename.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Type identity, used to look up the schema
    pub type_name: String,

    /// Field values keyed by declared property name
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Record {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl Value {
    /// Human-readable type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Record(_) => "record",
        }
    }

    /// Text of a scalar, or compact JSON for anything else. Used where a
    /// value stands in for a name or is joined into a string.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => crate::output::to_json(self),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}
