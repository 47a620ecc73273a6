//! Boolean, comparison and error built-ins.

use std::cmp::Ordering;

use super::{string_arg, Arity, BuiltinFunction, FunctionError};
use crate::script::value::Value;

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction::strict("bool", Arity::exactly(1), truthy),
    BuiltinFunction::strict("not", Arity::exactly(1), not),
    BuiltinFunction::strict("and", Arity::at_least(1), and),
    BuiltinFunction::strict("or", Arity::at_least(1), or),
    BuiltinFunction::strict("eq", Arity::exactly(2), eq),
    BuiltinFunction::strict("ne", Arity::exactly(2), ne),
    BuiltinFunction::strict("lt", Arity::exactly(2), lt),
    BuiltinFunction::strict("lte", Arity::exactly(2), lte),
    BuiltinFunction::strict("gt", Arity::exactly(2), gt),
    BuiltinFunction::strict("gte", Arity::exactly(2), gte),
    BuiltinFunction::strict("is_empty", Arity::exactly(1), is_empty),
    BuiltinFunction::strict("throw", Arity::exactly(1), throw),
    BuiltinFunction::strict("assert", Arity::exactly(2), assert),
];

fn truthy(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(args[0].is_truthy()))
}

fn not(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(!args[0].is_truthy()))
}

fn and(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(args.iter().all(Value::is_truthy)))
}

fn or(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(args.iter().any(Value::is_truthy)))
}

/// Equality treats integers and floats as numbers, so `%eq(1, 1.0)` holds.
fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            *a as f64 == *b
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equal(x, y))
        }
        _ => left == right,
    }
}

fn eq(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(equal(&args[0], &args[1])))
}

fn ne(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(!equal(&args[0], &args[1])))
}

fn order(left: &Value, right: &Value, function: &str) -> Result<Ordering, FunctionError> {
    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            left.as_float()?.partial_cmp(&right.as_float()?)
        }
        _ => None,
    };
    ordering.ok_or_else(|| {
        FunctionError::Argument(format!(
            "%{} cannot compare {} with {}",
            function,
            left.type_name(),
            right.type_name()
        ))
    })
}

fn lt(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(order(&args[0], &args[1], "lt")?.is_lt()))
}

fn lte(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(order(&args[0], &args[1], "lte")?.is_le()))
}

fn gt(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(order(&args[0], &args[1], "gt")?.is_gt()))
}

fn gte(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(order(&args[0], &args[1], "gte")?.is_ge()))
}

fn is_empty(args: &[Value]) -> Result<Value, FunctionError> {
    match &args[0] {
        Value::String(s) => Ok(Value::Boolean(s.is_empty())),
        Value::Array(items) => Ok(Value::Boolean(items.is_empty())),
        Value::Map(entries) => Ok(Value::Boolean(entries.is_empty())),
        other => Err(FunctionError::Argument(format!(
            "%is_empty expects a string, array or map, got {}",
            other.type_name()
        ))),
    }
}

fn throw(args: &[Value]) -> Result<Value, FunctionError> {
    Err(FunctionError::Thrown(args[0].to_string()))
}

/// `%assert(value, message)` yields `value` when truthy, otherwise raises `message`.
fn assert(args: &[Value]) -> Result<Value, FunctionError> {
    if args[0].is_truthy() {
        Ok(args[0].clone())
    } else {
        Err(FunctionError::Thrown(string_arg(args, 1, "assert")?.to_string()))
    }
}
