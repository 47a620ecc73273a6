//! Array and map built-ins.

use std::collections::BTreeMap;

use super::{array_arg, integer_arg, map_arg, Arity, BuiltinFunction, FunctionError};
use crate::script::value::Value;

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction::strict("array", Arity::at_least(0), array),
    BuiltinFunction::strict("array_at", Arity::between(2, 3), array_at),
    BuiltinFunction::strict("array_extend", Arity::at_least(1), array_extend),
    BuiltinFunction::strict("array_reverse", Arity::exactly(1), array_reverse),
    BuiltinFunction::strict("array_contains", Arity::exactly(2), array_contains),
    BuiltinFunction::strict("slice", Arity::between(2, 3), slice),
    BuiltinFunction::strict("len", Arity::exactly(1), len),
    BuiltinFunction::strict("map_get", Arity::between(2, 3), map_get),
    BuiltinFunction::strict("map_get_non_empty", Arity::exactly(3), map_get_non_empty),
    BuiltinFunction::strict("map_contains", Arity::exactly(2), map_contains),
    BuiltinFunction::strict("map_keys", Arity::exactly(1), map_keys),
    BuiltinFunction::strict("map_extend", Arity::at_least(1), map_extend),
];

/// Resolves a possibly negative index against `len`, counting from the end.
fn position(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len.saturating_add(index) } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Clamps a slice bound the way half-open ranges with negative offsets do.
fn bound(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { len_i.saturating_add(index) } else { index };
    resolved.clamp(0, len_i) as usize
}

fn array(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Array(args.to_vec()))
}

fn array_at(args: &[Value]) -> Result<Value, FunctionError> {
    let items = array_arg(args, 0, "array_at")?;
    let index = integer_arg(args, 1, "array_at")?;
    match (position(index, items.len()), args.get(2)) {
        (Some(i), _) => Ok(items[i].clone()),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(FunctionError::Argument(format!(
            "index {} is out of range for an array of length {}",
            index,
            items.len()
        ))),
    }
}

fn array_extend(args: &[Value]) -> Result<Value, FunctionError> {
    let mut extended = Vec::new();
    for index in 0..args.len() {
        extended.extend_from_slice(array_arg(args, index, "array_extend")?);
    }
    Ok(Value::Array(extended))
}

fn array_reverse(args: &[Value]) -> Result<Value, FunctionError> {
    let mut items = array_arg(args, 0, "array_reverse")?.to_vec();
    items.reverse();
    Ok(Value::Array(items))
}

fn array_contains(args: &[Value]) -> Result<Value, FunctionError> {
    let items = array_arg(args, 0, "array_contains")?;
    Ok(Value::Boolean(items.contains(&args[1])))
}

/// `%slice(value, start, end?)` over the characters of a string or the items of an array.
fn slice(args: &[Value]) -> Result<Value, FunctionError> {
    let start = integer_arg(args, 1, "slice")?;
    let end = match args.get(2) {
        Some(_) => Some(integer_arg(args, 2, "slice")?),
        None => None,
    };
    let range = |len: usize| {
        let from = bound(start, len);
        let to = end.map_or(len, |end| bound(end, len));
        from..to.max(from)
    };

    match &args[0] {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::String(chars[range(chars.len())].iter().collect()))
        }
        Value::Array(items) => Ok(Value::Array(items[range(items.len())].to_vec())),
        other => Err(FunctionError::Argument(format!(
            "%slice expects a string or array, got {}",
            other.type_name()
        ))),
    }
}

fn len(args: &[Value]) -> Result<Value, FunctionError> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => {
            return Err(FunctionError::Argument(format!(
                "%len expects a string, array or map, got {}",
                other.type_name()
            )))
        }
    };
    i64::try_from(len)
        .map(Value::Integer)
        .map_err(|_| FunctionError::Argument("%len result is too large".to_string()))
}

/// Map keys are strings; scalar lookups are rendered before matching.
fn key(args: &[Value], index: usize, function: &str) -> Result<String, FunctionError> {
    match &args[index] {
        Value::String(s) => Ok(s.clone()),
        scalar @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
            Ok(scalar.to_string())
        }
        other => Err(FunctionError::Argument(format!(
            "%{} key must be a string, got {}",
            function,
            other.type_name()
        ))),
    }
}

fn map_get(args: &[Value]) -> Result<Value, FunctionError> {
    let entries = map_arg(args, 0, "map_get")?;
    let key = key(args, 1, "map_get")?;
    match (entries.get(&key), args.get(2)) {
        (Some(value), _) => Ok(value.clone()),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(FunctionError::Argument(format!(
            "key '{}' does not exist and no default was given",
            key
        ))),
    }
}

/// Like `%map_get`, but also falls back to the default for empty strings and containers.
fn map_get_non_empty(args: &[Value]) -> Result<Value, FunctionError> {
    let entries = map_arg(args, 0, "map_get_non_empty")?;
    let key = key(args, 1, "map_get_non_empty")?;
    let empty = |value: &Value| match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Map(entries) => entries.is_empty(),
        _ => false,
    };
    match entries.get(&key) {
        Some(value) if !empty(value) => Ok(value.clone()),
        _ => Ok(args[2].clone()),
    }
}

fn map_contains(args: &[Value]) -> Result<Value, FunctionError> {
    let entries = map_arg(args, 0, "map_contains")?;
    let key = key(args, 1, "map_contains")?;
    Ok(Value::Boolean(entries.contains_key(&key)))
}

fn map_keys(args: &[Value]) -> Result<Value, FunctionError> {
    let entries = map_arg(args, 0, "map_keys")?;
    Ok(Value::Array(entries.keys().map(|k| Value::from(k.as_str())).collect()))
}

/// Later maps win on key collisions.
fn map_extend(args: &[Value]) -> Result<Value, FunctionError> {
    let mut extended = BTreeMap::new();
    for index in 0..args.len() {
        let entries = map_arg(args, index, "map_extend")?;
        extended.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Ok(Value::Map(extended))
}
