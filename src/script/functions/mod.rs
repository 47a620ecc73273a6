//! Built-in functions available to every script.
//!
//! Built-ins are pure: the same arguments always produce the same value. Strict
//! functions never observe [`Value::Unresolvable`]; the interpreter short-circuits
//! the call to `Unresolvable` when any argument is unresolvable. Conditional
//! functions (`%if`, `%elif`, `%if_passthrough`) are evaluated lazily by the
//! interpreter so that an unused branch cannot make the result unresolvable.

mod collection;
mod logic;
mod numeric;
mod string;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::script::error::ScriptError;
use crate::script::value::Value;

/// Signature of a strict built-in function.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, FunctionError>;

/// Failure raised by a built-in function.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// The arguments were not acceptable.
    Argument(String),
    /// The script asked for an error (`%throw`, `%assert`).
    Thrown(String),
}

impl FunctionError {
    /// Attribute the failure to `function`, called while evaluating `chain`.
    pub(crate) fn into_script_error(self, function: &str, chain: Vec<String>) -> ScriptError {
        match self {
            FunctionError::Argument(message) => ScriptError::FunctionArgument {
                function: function.to_string(),
                message,
                chain,
            },
            FunctionError::Thrown(message) => ScriptError::UserThrown { message, chain },
        }
    }
}

impl From<String> for FunctionError {
    fn from(message: String) -> Self {
        FunctionError::Argument(message)
    }
}

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    min: usize,
    max: Option<usize>,
}

impl Arity {
    /// Exactly `n` arguments.
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// Between `min` and `max` arguments, inclusive.
    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// At least `min` arguments.
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// Whether `count` arguments are accepted.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{}..={}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Lazily evaluated conditional forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conditional {
    /// `%if(condition, then, else)`
    If,
    /// `%elif(condition, value, condition, value, ..., else)`
    Elif,
    /// `%if_passthrough(value, else)`: `value` when truthy, otherwise `else`.
    IfPassthrough,
}

/// How a built-in function is evaluated.
#[derive(Debug, Clone, Copy)]
pub enum Implementation {
    /// Arguments are evaluated first, then passed to the function.
    Strict(BuiltinFn),
    /// Arguments are evaluated on demand by the interpreter.
    Conditional(Conditional),
}

/// A registered built-in function.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinFunction {
    name: &'static str,
    arity: Arity,
    implementation: Implementation,
}

impl BuiltinFunction {
    /// Create a strict built-in function.
    pub const fn strict(name: &'static str, arity: Arity, function: BuiltinFn) -> Self {
        Self {
            name,
            arity,
            implementation: Implementation::Strict(function),
        }
    }

    const fn conditional(name: &'static str, arity: Arity, kind: Conditional) -> Self {
        Self {
            name,
            arity,
            implementation: Implementation::Conditional(kind),
        }
    }

    /// Function name, without the leading `%`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Accepted argument count.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Evaluation strategy.
    pub fn implementation(&self) -> Implementation {
        self.implementation
    }
}

/// Mapping from function name to built-in implementation.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, BuiltinFunction>,
}

static BUILTINS: LazyLock<Arc<FunctionRegistry>> =
    LazyLock::new(|| Arc::new(FunctionRegistry::with_builtins()));

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry containing every built-in function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for function in string::FUNCTIONS
            .iter()
            .chain(numeric::FUNCTIONS)
            .chain(logic::FUNCTIONS)
            .chain(collection::FUNCTIONS)
            .chain(CONDITIONALS)
        {
            registry.register(*function);
        }
        registry
    }

    /// The shared registry of built-in functions.
    pub fn builtins() -> Arc<FunctionRegistry> {
        Arc::clone(&BUILTINS)
    }

    /// Register a function, replacing any function with the same name.
    pub fn register(&mut self, function: BuiltinFunction) -> Option<BuiltinFunction> {
        self.functions.insert(function.name, function)
    }

    /// Look up a function by name.
    pub fn lookup(&self, name: &str) -> Option<&BuiltinFunction> {
        self.functions.get(name)
    }

    /// Names of all registered functions, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

const CONDITIONALS: &[BuiltinFunction] = &[
    BuiltinFunction::conditional("if", Arity::exactly(3), Conditional::If),
    BuiltinFunction::conditional("elif", Arity::at_least(3), Conditional::Elif),
    BuiltinFunction::conditional("if_passthrough", Arity::exactly(2), Conditional::IfPassthrough),
];

fn string_arg<'a>(
    args: &'a [Value],
    index: usize,
    function: &str,
) -> Result<&'a str, FunctionError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(FunctionError::Argument(format!(
            "argument {} of %{} must be a string, got {}",
            index + 1,
            function,
            other.type_name()
        ))),
        None => Err(missing(index, function)),
    }
}

fn integer_arg(args: &[Value], index: usize, function: &str) -> Result<i64, FunctionError> {
    match args.get(index) {
        Some(value @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_))) => {
            Ok(value.as_integer()?)
        }
        Some(other) => Err(FunctionError::Argument(format!(
            "argument {} of %{} must be a number, got {}",
            index + 1,
            function,
            other.type_name()
        ))),
        None => Err(missing(index, function)),
    }
}

fn array_arg<'a>(
    args: &'a [Value],
    index: usize,
    function: &str,
) -> Result<&'a [Value], FunctionError> {
    match args.get(index) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(FunctionError::Argument(format!(
            "argument {} of %{} must be an array, got {}",
            index + 1,
            function,
            other.type_name()
        ))),
        None => Err(missing(index, function)),
    }
}

fn map_arg<'a>(
    args: &'a [Value],
    index: usize,
    function: &str,
) -> Result<&'a std::collections::BTreeMap<String, Value>, FunctionError> {
    match args.get(index) {
        Some(Value::Map(entries)) => Ok(entries),
        Some(other) => Err(FunctionError::Argument(format!(
            "argument {} of %{} must be a map, got {}",
            index + 1,
            function,
            other.type_name()
        ))),
        None => Err(missing(index, function)),
    }
}

fn missing(index: usize, function: &str) -> FunctionError {
    FunctionError::Argument(format!("%{} is missing argument {}", function, index + 1))
}
