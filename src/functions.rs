//! Built-in transform functions.
//!
//! [`CoreFunctions`] is the module registered by
//! [`EngineBuilder`](crate::EngineBuilder) unless it is told otherwise. Every
//! function receives the field's value (or, in key position, its name) as
//! its input, followed by the arguments written in the filter.

use std::cmp::Ordering;

use regex::Regex;

use crate::{
    registry::{Candidate, FunctionDefinition, FunctionError, FunctionModule, ParamType, ParameterShape},
    value::Value,
};

type Body = fn(&Value, &[Value]) -> Result<Value, FunctionError>;

/// The standard library of string and collection functions
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreFunctions;

fn candidate(name: &str, input: ParamType, args: &[ParamType], body: Body) -> Candidate {
    let shape = ParameterShape::new(input, args.to_vec());
    Candidate::new(FunctionDefinition::new(name, shape, body)).exported()
}

impl FunctionModule for CoreFunctions {
    fn name(&self) -> &str {
        "core"
    }

    fn candidates(&self) -> Vec<Candidate> {
        use ParamType::*;

        vec![
            // Strings
            candidate("reverse", String, &[], reverse_string),
            candidate("upper", String, &[], upper),
            candidate("lower", String, &[], lower),
            candidate("trim", String, &[], trim),
            candidate("split", String, &[String], split),
            candidate("substring", String, &[Integer], substring),
            candidate("substring", String, &[Integer, Integer], substring),
            candidate("replace", String, &[String, String], replace),
            candidate("matches", String, &[String], matches),
            candidate("prefix", Any, &[String], prefix),
            candidate("suffix", Any, &[String], suffix),
            // Sizes
            candidate("length", String, &[], length).alias("size"),
            candidate("length", Array, &[], length).alias("size"),
            candidate("length", Object, &[], length).alias("size"),
            // Arrays
            candidate("reverse", Array, &[], reverse_array),
            candidate("first", Array, &[], first),
            candidate("last", Array, &[], last),
            candidate("sort", Array, &[], sort),
            candidate("unique", Array, &[], unique),
            candidate("flatten", Array, &[], flatten),
            candidate("join", Array, &[String], join),
            // Objects
            candidate("keys", Object, &[], keys),
            candidate("values", Object, &[], values),
            // Nulls
            candidate("default", Null, &[Any], default_null),
            candidate("default", Any, &[Any], default_present),
        ]
    }
}

fn string(value: &Value) -> Result<&str, FunctionError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(FunctionError::mismatch("string", other)),
    }
}

fn array(value: &Value) -> Result<&[Value], FunctionError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(FunctionError::mismatch("array", other)),
    }
}

fn integer(value: &Value) -> Result<i64, FunctionError> {
    match value {
        Value::Integer(n) => Ok(*n),
        other => Err(FunctionError::mismatch("integer", other)),
    }
}

fn arg(args: &[Value], index: usize) -> Result<&Value, FunctionError> {
    args.get(index)
        .ok_or_else(|| FunctionError::Invalid(format!("missing argument {}", index + 1)))
}

/// reverse() on strings, by character
fn reverse_string(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string(input)?.chars().rev().collect()))
}

fn reverse_array(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    let mut reversed = array(input)?.to_vec();
    reversed.reverse();
    Ok(Value::Array(reversed))
}

fn upper(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string(input)?.to_uppercase()))
}

fn lower(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string(input)?.to_lowercase()))
}

fn trim(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string(input)?.trim().to_string()))
}

/// split(sep); an empty separator splits into characters
fn split(input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let s = string(input)?;
    let sep = string(arg(args, 0)?)?;

    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(sep).map(|p| Value::String(p.to_string())).collect()
    };
    Ok(Value::Array(parts))
}

/// substring(start) and substring(start, end), in characters. Bounds are
/// clamped to the string.
fn substring(input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let chars: Vec<char> = string(input)?.chars().collect();
    let clamp = |n: i64| usize::try_from(n.max(0)).unwrap_or(usize::MAX).min(chars.len());

    let start = clamp(integer(arg(args, 0)?)?);
    let end = match args.get(1) {
        Some(end) => clamp(integer(end)?),
        None => chars.len(),
    };

    if end <= start {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn replace(input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let s = string(input)?;
    let from = string(arg(args, 0)?)?;
    let to = string(arg(args, 1)?)?;

    if from.is_empty() {
        return Err(FunctionError::Invalid("replace() pattern cannot be empty".to_string()));
    }
    Ok(Value::String(s.replace(from, to)))
}

/// matches(regex), searched anywhere in the string
fn matches(input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let s = string(input)?;
    let pattern = string(arg(args, 0)?)?;
    let re = Regex::new(pattern).map_err(|e| FunctionError::Invalid(format!("invalid regex: {e}")))?;
    Ok(Value::Boolean(re.is_match(s)))
}

fn prefix(input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let text = string(arg(args, 0)?)?;
    Ok(Value::String(format!("{}{}", text, input.as_string())))
}

fn suffix(input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let text = string(arg(args, 0)?)?;
    Ok(Value::String(format!("{}{}", input.as_string(), text)))
}

/// length() of strings (characters), arrays and objects
fn length(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    let len = match input {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Record(record) => record.fields.len(),
        other => return Err(FunctionError::mismatch("string, array or object", other)),
    };
    Ok(Value::Integer(i64::try_from(len).unwrap_or(i64::MAX)))
}

fn first(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    Ok(array(input)?.first().cloned().unwrap_or(Value::Null))
}

fn last(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    Ok(array(input)?.last().cloned().unwrap_or(Value::Null))
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// sort() ascending; values of different kinds keep their relative order
fn sort(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    let mut sorted = array(input)?.to_vec();
    sorted.sort_by(compare_values);
    Ok(Value::Array(sorted))
}

fn unique(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    let mut result: Vec<Value> = Vec::new();
    for item in array(input)? {
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    Ok(Value::Array(result))
}

/// flatten() one level
fn flatten(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    let mut result = Vec::new();
    for item in array(input)? {
        match item {
            Value::Array(inner) => result.extend(inner.iter().cloned()),
            other => result.push(other.clone()),
        }
    }
    Ok(Value::Array(result))
}

fn join(input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let sep = string(arg(args, 0)?)?;
    let parts: Vec<String> = array(input)?.iter().map(Value::as_string).collect();
    Ok(Value::String(parts.join(sep)))
}

fn keys(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    let keys: Vec<Value> = match input {
        Value::Object(map) => map.keys().map(|k| Value::String(k.clone())).collect(),
        Value::Record(record) => record.fields.keys().map(|k| Value::String(k.clone())).collect(),
        other => return Err(FunctionError::mismatch("object", other)),
    };
    Ok(Value::Array(keys))
}

fn values(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    let values: Vec<Value> = match input {
        Value::Object(map) => map.values().cloned().collect(),
        Value::Record(record) => record.fields.values().cloned().collect(),
        other => return Err(FunctionError::mismatch("object", other)),
    };
    Ok(Value::Array(values))
}

/// default(fallback) on null
fn default_null(_: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(arg(args, 0)?.clone())
}

fn default_present(input: &Value, _: &[Value]) -> Result<Value, FunctionError> {
    Ok(input.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FunctionRegistry, RegistrationStrategy};
    use crate::ast::{FunctionCall, ParseContext};

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register_module(&CoreFunctions, RegistrationStrategy::Auto);
        registry
    }

    fn run(name: &str, input: Value, args: Vec<Value>) -> Value {
        let registry = registry();
        let call = FunctionCall::new(name, Vec::new(), ParseContext::new(1, 1));
        registry
            .resolve(&call, &input, &args)
            .unwrap()
            .invoke(&input, &args)
            .unwrap()
    }

    #[test]
    fn test_reverse_picks_overload_by_input() {
        assert_eq!(run("reverse", Value::from("abc"), vec![]), Value::from("cba"));
        assert_eq!(
            run("reverse", Value::Array(vec![Value::Integer(1), Value::Integer(2)]), vec![]),
            Value::Array(vec![Value::Integer(2), Value::Integer(1)])
        );
    }

    #[test]
    fn test_substring_clamps() {
        assert_eq!(run("substring", Value::from("hello"), vec![Value::Integer(1), Value::Integer(3)]), Value::from("el"));
        assert_eq!(run("substring", Value::from("hello"), vec![Value::Integer(3)]), Value::from("lo"));
        assert_eq!(run("substring", Value::from("hi"), vec![Value::Integer(5)]), Value::from(""));
    }

    #[test]
    fn test_size_is_an_alias_of_length() {
        assert_eq!(run("size", Value::from("héllo"), vec![]), Value::Integer(5));
    }

    #[test]
    fn test_default_prefers_null_overload() {
        assert_eq!(run("default", Value::Null, vec![Value::from("n/a")]), Value::from("n/a"));
        assert_eq!(run("default", Value::from("x"), vec![Value::from("n/a")]), Value::from("x"));
    }

    #[test]
    fn test_sort_mixed_numbers() {
        let input = Value::Array(vec![Value::Float(2.5), Value::Integer(1), Value::Integer(3)]);
        assert_eq!(
            run("sort", input, vec![]),
            Value::Array(vec![Value::Integer(1), Value::Float(2.5), Value::Integer(3)])
        );
    }
}
