//! Numeric built-ins.
//!
//! Integer arithmetic stays integral and fails on overflow. As soon as a float is
//! involved the result is a float.

use std::cmp::Ordering;

use super::{Arity, BuiltinFunction, FunctionError};
use crate::script::value::Value;

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction::strict("int", Arity::exactly(1), int),
    BuiltinFunction::strict("float", Arity::exactly(1), float),
    BuiltinFunction::strict("add", Arity::at_least(2), add),
    BuiltinFunction::strict("sub", Arity::exactly(2), sub),
    BuiltinFunction::strict("mul", Arity::at_least(2), mul),
    BuiltinFunction::strict("div", Arity::exactly(2), div),
    BuiltinFunction::strict("mod", Arity::exactly(2), modulo),
    BuiltinFunction::strict("max", Arity::at_least(1), max),
    BuiltinFunction::strict("min", Arity::at_least(1), min),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn from_value(value: &Value, function: &str) -> Result<Self, FunctionError> {
        match value {
            Value::Integer(n) => Ok(Number::Integer(*n)),
            Value::Float(n) => Ok(Number::Float(*n)),
            Value::Boolean(b) => Ok(Number::Integer(i64::from(*b))),
            other => Err(FunctionError::Argument(format!(
                "%{} expects numbers, got {}",
                function,
                other.type_name()
            ))),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

fn numbers(args: &[Value], function: &str) -> Result<Vec<Number>, FunctionError> {
    args.iter().map(|arg| Number::from_value(arg, function)).collect()
}

fn finite(n: f64, function: &str) -> Result<Value, FunctionError> {
    if n.is_finite() {
        Ok(Value::Float(n))
    } else {
        Err(FunctionError::Argument(format!("%{} produced a non-finite result", function)))
    }
}

fn overflow(function: &str) -> FunctionError {
    FunctionError::Argument(format!("%{} overflowed", function))
}

/// Folds the arguments with `checked` while they are all integers, switching to
/// `float` once any float appears.
fn fold(
    args: &[Value],
    function: &str,
    checked: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Value, FunctionError> {
    let numbers = numbers(args, function)?;
    let mut acc = numbers[0];
    for n in &numbers[1..] {
        acc = match (acc, *n) {
            (Number::Integer(a), Number::Integer(b)) => {
                Number::Integer(checked(a, b).ok_or_else(|| overflow(function))?)
            }
            (a, b) => Number::Float(float(a.as_f64(), b.as_f64())),
        };
    }
    match acc {
        Number::Integer(n) => Ok(Value::Integer(n)),
        Number::Float(n) => finite(n, function),
    }
}

fn int(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Integer(args[0].as_integer()?))
}

fn float(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Float(args[0].as_float()?))
}

fn add(args: &[Value]) -> Result<Value, FunctionError> {
    fold(args, "add", i64::checked_add, |a, b| a + b)
}

fn sub(args: &[Value]) -> Result<Value, FunctionError> {
    fold(args, "sub", i64::checked_sub, |a, b| a - b)
}

fn mul(args: &[Value]) -> Result<Value, FunctionError> {
    fold(args, "mul", i64::checked_mul, |a, b| a * b)
}

/// Integer operands use floor division; anything else divides as floats.
fn div(args: &[Value]) -> Result<Value, FunctionError> {
    let numbers = numbers(args, "div")?;
    match (numbers[0], numbers[1]) {
        (_, Number::Integer(0)) => Err(FunctionError::Argument("%div by zero".to_string())),
        (_, Number::Float(d)) if d == 0.0 => {
            Err(FunctionError::Argument("%div by zero".to_string()))
        }
        (Number::Integer(a), Number::Integer(b)) => {
            let quotient = a.checked_div(b).ok_or_else(|| overflow("div"))?;
            let floored = if a % b != 0 && (a < 0) != (b < 0) {
                quotient - 1
            } else {
                quotient
            };
            Ok(Value::Integer(floored))
        }
        (a, b) => finite(a.as_f64() / b.as_f64(), "div"),
    }
}

/// Result takes the sign of the divisor.
fn modulo(args: &[Value]) -> Result<Value, FunctionError> {
    let numbers = numbers(args, "mod")?;
    match (numbers[0], numbers[1]) {
        (_, Number::Integer(0)) => Err(FunctionError::Argument("%mod by zero".to_string())),
        (_, Number::Float(d)) if d == 0.0 => {
            Err(FunctionError::Argument("%mod by zero".to_string()))
        }
        (Number::Integer(a), Number::Integer(b)) => {
            let remainder = a.checked_rem(b).ok_or_else(|| overflow("mod"))?;
            let adjusted = if remainder != 0 && (remainder < 0) != (b < 0) {
                remainder + b
            } else {
                remainder
            };
            Ok(Value::Integer(adjusted))
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            finite(a - b * (a / b).floor(), "mod")
        }
    }
}

fn compare(a: Number, b: Number) -> Ordering {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => a.cmp(&b),
        (a, b) => a.as_f64().total_cmp(&b.as_f64()),
    }
}

fn extreme(args: &[Value], function: &str, keep: Ordering) -> Result<Value, FunctionError> {
    let numbers = numbers(args, function)?;
    let mut best = numbers[0];
    for n in &numbers[1..] {
        if compare(*n, best) == keep {
            best = *n;
        }
    }
    Ok(match best {
        Number::Integer(n) => Value::Integer(n),
        Number::Float(n) => Value::Float(n),
    })
}

fn max(args: &[Value]) -> Result<Value, FunctionError> {
    extreme(args, "max", Ordering::Greater)
}

fn min(args: &[Value]) -> Result<Value, FunctionError> {
    extreme(args, "min", Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i(n: i64) -> Value {
        Value::Integer(n)
    }

    #[test]
    fn test_int_and_float_conversions() {
        assert_eq!(int(&[Value::from("0042")]), Ok(i(42)));
        assert_eq!(int(&[Value::Float(9.99)]), Ok(i(9)));
        assert_eq!(float(&[i(3)]), Ok(Value::Float(3.0)));
        assert!(int(&[Value::from("forty")]).is_err());
    }

    #[test]
    fn test_arithmetic_keeps_integers_integral() {
        assert_eq!(add(&[i(1), i(2), i(3)]), Ok(i(6)));
        assert_eq!(add(&[i(1), Value::Float(0.5)]), Ok(Value::Float(1.5)));
        assert_eq!(sub(&[i(1), i(3)]), Ok(i(-2)));
        assert_eq!(mul(&[i(4), Value::Boolean(true)]), Ok(i(4)));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(add(&[i(i64::MAX), i(1)]).is_err());
        assert!(mul(&[i(i64::MIN), i(-1)]).is_err());
    }

    #[test]
    fn test_division_and_modulo() {
        assert_eq!(div(&[i(7), i(2)]), Ok(i(3)));
        assert_eq!(div(&[i(-7), i(2)]), Ok(i(-4)));
        assert_eq!(div(&[i(7), i(-2)]), Ok(i(-4)));
        assert_eq!(div(&[i(-7), i(-2)]), Ok(i(3)));
        assert_eq!(div(&[i(7), Value::Float(2.0)]), Ok(Value::Float(3.5)));
        assert_eq!(modulo(&[i(-7), i(3)]), Ok(i(2)));
        assert_eq!(modulo(&[i(7), i(-3)]), Ok(i(-2)));
        assert!(div(&[i(1), i(0)]).is_err());
        assert!(modulo(&[i(1), Value::Float(0.0)]).is_err());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(max(&[i(1), i(5), i(3)]), Ok(i(5)));
        assert_eq!(min(&[i(1), Value::Float(-0.5)]), Ok(Value::Float(-0.5)));
        assert!(max(&[Value::from("a")]).is_err());
    }
}
