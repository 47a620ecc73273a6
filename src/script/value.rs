//! Runtime value types for script resolution.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A resolved value of a script variable.
///
/// `Unresolvable` is not an error: it marks a variable whose dependencies are not
/// known yet. It never appears nested inside an [`Value::Array`] or [`Value::Map`];
/// a container built from an unresolvable element is itself unresolvable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value. Always finite.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// String-keyed map of values, ordered by key.
    Map(BTreeMap<String, Value>),
    /// Depends on a fact that has not been supplied yet.
    Unresolvable,
}

impl Value {
    /// Get the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Unresolvable => "unresolvable",
        }
    }

    /// Whether this value is the [`Value::Unresolvable`] sentinel.
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Value::Unresolvable)
    }

    /// Borrow the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by conditionals and `%bool`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Boolean(b) => *b,
            Value::Array(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Unresolvable => false,
        }
    }

    /// Try to convert the value to an integer.
    ///
    /// Floats are truncated toward zero; strings are parsed after trimming.
    pub fn as_integer(&self) -> Result<i64, String> {
        match self {
            Value::Integer(n) => Ok(*n),
            Value::Float(n) => float_to_integer(*n),
            Value::Boolean(b) => Ok(i64::from(*b)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .or_else(|_| {
                        trimmed
                            .parse::<f64>()
                            .map_err(|_| ())
                            .and_then(|n| float_to_integer(n).map_err(|_| ()))
                    })
                    .map_err(|_| format!("Cannot convert '{}' to integer", s))
            }
            other => Err(format!("Cannot convert {} to integer", other.type_name())),
        }
    }

    /// Try to convert the value to a float.
    pub fn as_float(&self) -> Result<f64, String> {
        match self {
            Value::Integer(n) => Ok(*n as f64),
            Value::Float(n) => Ok(*n),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| format!("Cannot convert '{}' to float", s)),
            other => Err(format!("Cannot convert {} to float", other.type_name())),
        }
    }

    fn contains_unresolvable(&self) -> bool {
        match self {
            Value::Unresolvable => true,
            Value::Array(items) => items.iter().any(Value::contains_unresolvable),
            Value::Map(entries) => entries.values().any(Value::contains_unresolvable),
            _ => false,
        }
    }
}

fn float_to_integer(n: f64) -> Result<i64, String> {
    let truncated = n.trunc();
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Ok(truncated as i64)
    } else {
        Err(format!("Float {} is out of integer range", n))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write_float(f, *n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(_) | Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Value::Unresolvable => f.write_str("<unresolvable>"),
        }
    }
}

/// Floats always render with a fractional part, so they never read as integers.
fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    let rendered = n.to_string();
    if !n.is_finite() || rendered.contains(['.', 'e', 'E']) {
        f.write_str(&rendered)
    } else {
        write!(f, "{}.0", rendered)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Unresolvable => serializer.serialize_unit(),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

/// Conversion of a native Rust value into a script [`Value`].
///
/// The mapping is total over the implementing types; values that have no script
/// representation (non-finite floats, integers beyond `i64`, `null`) are rejected
/// with a message here rather than deep inside evaluation.
pub trait ToScript {
    /// Convert this value into a script value.
    fn to_script(&self) -> Result<Value, String>;
}

/// Convert any supported native value into a script [`Value`].
pub fn to_script<T: ToScript + ?Sized>(value: &T) -> Result<Value, String> {
    value.to_script()
}

impl<T: ToScript + ?Sized> ToScript for &T {
    fn to_script(&self) -> Result<Value, String> {
        (**self).to_script()
    }
}

impl ToScript for Value {
    fn to_script(&self) -> Result<Value, String> {
        if self.contains_unresolvable() {
            return Err("an unresolvable value cannot be supplied as a concrete value".to_string());
        }
        Ok(self.clone())
    }
}

impl ToScript for str {
    fn to_script(&self) -> Result<Value, String> {
        Ok(Value::String(self.to_string()))
    }
}

impl ToScript for String {
    fn to_script(&self) -> Result<Value, String> {
        Ok(Value::String(self.clone()))
    }
}

impl ToScript for bool {
    fn to_script(&self) -> Result<Value, String> {
        Ok(Value::Boolean(*self))
    }
}

macro_rules! lossless_integer {
    ($($ty:ty),*) => {
        $(
            impl ToScript for $ty {
                fn to_script(&self) -> Result<Value, String> {
                    Ok(Value::Integer(i64::from(*self)))
                }
            }
        )*
    };
}

lossless_integer!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! checked_integer {
    ($($ty:ty),*) => {
        $(
            impl ToScript for $ty {
                fn to_script(&self) -> Result<Value, String> {
                    i64::try_from(*self)
                        .map(Value::Integer)
                        .map_err(|_| format!("integer {} exceeds the script integer range", self))
                }
            }
        )*
    };
}

checked_integer!(u64, usize, isize, i128, u128);

impl ToScript for f64 {
    fn to_script(&self) -> Result<Value, String> {
        if self.is_finite() {
            Ok(Value::Float(*self))
        } else {
            Err(format!("non-finite float {} has no script representation", self))
        }
    }
}

impl ToScript for f32 {
    fn to_script(&self) -> Result<Value, String> {
        f64::from(*self).to_script()
    }
}

impl<T: ToScript> ToScript for [T] {
    fn to_script(&self) -> Result<Value, String> {
        self.iter()
            .map(ToScript::to_script)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl<T: ToScript> ToScript for Vec<T> {
    fn to_script(&self) -> Result<Value, String> {
        self.as_slice().to_script()
    }
}

impl<T: ToScript> ToScript for Option<T> {
    fn to_script(&self) -> Result<Value, String> {
        match self {
            Some(value) => value.to_script(),
            None => Err("null has no script representation".to_string()),
        }
    }
}

impl<K: AsRef<str>, T: ToScript> ToScript for BTreeMap<K, T> {
    fn to_script(&self) -> Result<Value, String> {
        self.iter()
            .map(|(key, value)| Ok((key.as_ref().to_string(), value.to_script()?)))
            .collect::<Result<BTreeMap<_, _>, String>>()
            .map(Value::Map)
    }
}

impl<K: AsRef<str>, T: ToScript, S> ToScript for HashMap<K, T, S> {
    fn to_script(&self) -> Result<Value, String> {
        self.iter()
            .map(|(key, value)| Ok((key.as_ref().to_string(), value.to_script()?)))
            .collect::<Result<BTreeMap<_, _>, String>>()
            .map(Value::Map)
    }
}

impl ToScript for serde_json::Value {
    fn to_script(&self) -> Result<Value, String> {
        match self {
            serde_json::Value::Null => Err("null has no script representation".to_string()),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(n) = n.as_i64() {
                    Ok(Value::Integer(n))
                } else if let Some(n) = n.as_u64() {
                    n.to_script()
                } else {
                    n.as_f64()
                        .ok_or_else(|| format!("number {} has no script representation", n))?
                        .to_script()
                }
            }
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Array(items) => items.as_slice().to_script(),
            serde_json::Value::Object(entries) => entries.to_script(),
        }
    }
}

impl ToScript for serde_json::Map<String, serde_json::Value> {
    /// Object members that are `null` are treated as absent and omitted.
    fn to_script(&self) -> Result<Value, String> {
        self.iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                value
                    .to_script()
                    .map(|value| (key.clone(), value))
                    .map_err(|e| format!("{}: {}", key, e))
            })
            .collect::<Result<BTreeMap<_, _>, String>>()
            .map(Value::Map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_is_stable_across_tags() {
        assert_eq!(Value::from("raw").to_string(), "raw");
        assert_eq!(Value::Integer(-4).to_string(), "-4");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(1e20).to_string(), "100000000000000000000.0");
        assert_eq!(Value::Float(-1e16).to_string(), "-10000000000000000.0");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(
            Value::Array(vec![Value::from("a"), Value::Integer(1)]).to_string(),
            r#"["a",1]"#
        );

        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), Value::Boolean(false));
        entries.insert("a".to_string(), Value::Float(1.0));
        assert_eq!(Value::Map(entries).to_string(), r#"{"a":1.0,"b":false}"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::from("x").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(!Value::Unresolvable.is_truthy());
    }

    #[test]
    fn test_as_integer_conversions() {
        assert_eq!(Value::from(" 42 ").as_integer(), Ok(42));
        assert_eq!(Value::from("3.9").as_integer(), Ok(3));
        assert_eq!(Value::Float(-2.7).as_integer(), Ok(-2));
        assert_eq!(Value::Boolean(true).as_integer(), Ok(1));
        assert!(Value::from("abc").as_integer().is_err());
        assert!(Value::Array(vec![]).as_integer().is_err());
    }

    #[test]
    fn test_to_script_json_metadata() {
        let metadata = json!({
            "id": "abc123",
            "duration": 61,
            "rating": 4.5,
            "tags": ["a", "b"],
            "release_date": null,
            "is_live": false,
        });

        let value = to_script(&metadata).unwrap();
        let Value::Map(entries) = value else {
            panic!("expected a map");
        };
        assert_eq!(entries.get("id"), Some(&Value::from("abc123")));
        assert_eq!(entries.get("duration"), Some(&Value::Integer(61)));
        assert_eq!(entries.get("rating"), Some(&Value::Float(4.5)));
        assert_eq!(
            entries.get("tags"),
            Some(&Value::Array(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(entries.get("is_live"), Some(&Value::Boolean(false)));
        assert!(!entries.contains_key("release_date"));
    }

    #[test]
    fn test_to_script_rejects_unrepresentable() {
        assert!(to_script(&f64::NAN).is_err());
        assert!(to_script(&f64::INFINITY).is_err());
        assert!(to_script(&u64::MAX).is_err());
        assert!(to_script(&serde_json::Value::Null).is_err());
        assert!(to_script(&json!([1, null])).is_err());
        assert!(to_script(&Option::<i32>::None).is_err());
        assert!(to_script(&Value::Unresolvable).is_err());
        assert!(to_script(&Value::Array(vec![Value::Unresolvable])).is_err());
    }

    #[test]
    fn test_to_script_native_collections() {
        let mut map = HashMap::new();
        map.insert("n", vec![1u8, 2u8]);
        assert_eq!(
            to_script(&map).unwrap(),
            Value::Map(BTreeMap::from([(
                "n".to_string(),
                Value::Array(vec![Value::Integer(1), Value::Integer(2)])
            )]))
        );
        assert_eq!(to_script("hi").unwrap(), Value::from("hi"));
        assert_eq!(to_script(&7usize).unwrap(), Value::Integer(7));
    }
}
