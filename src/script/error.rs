//! Error types for script parsing and resolution.

use thiserror::Error;

/// Errors that can occur while defining or resolving scripts.
///
/// A variable that merely cannot be computed yet is *not* an error; it resolves to
/// [`Value::Unresolvable`](crate::script::Value::Unresolvable). The variants below
/// are definition, evaluation and conversion defects that abort the current call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// A definition's source could not be parsed.
    #[error("Parse error in '{name}' at line {line}, column {col}: {message}")]
    Parse {
        /// Name of the definition being parsed.
        name: String,
        /// Line number where the error occurred.
        line: usize,
        /// Column number where the error occurred.
        col: usize,
        /// Error message.
        message: String,
    },

    /// A definition name is not a valid identifier.
    #[error("Invalid name '{name}': names must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A function parameter (`$0`, `$1`, ...) was used outside a custom function.
    #[error("Parameter ${parameter} used in '{definition}', which is not a function")]
    UnboundParameter {
        /// Parameter index.
        parameter: usize,
        /// Definition that used the parameter.
        definition: String,
    },

    /// The dependency graph contains a cycle.
    ///
    /// The cycle lists the path of names, starting and ending with the same name.
    /// Custom functions are prefixed with `%`.
    #[error("Cycle detected: {}", cycle.join(" -> "))]
    CycleDetected {
        /// Names along the cycle.
        cycle: Vec<String>,
    },

    /// A variable references a name that is neither defined nor unresolvable.
    #[error("Undefined reference '{name}' in '{referenced_by}'")]
    UndefinedReference {
        /// The missing name.
        name: String,
        /// Definition containing the reference.
        referenced_by: String,
    },

    /// A call names neither a custom nor a built-in function.
    #[error("Undefined function '%{name}' in '{referenced_by}'")]
    UndefinedFunction {
        /// The missing function name.
        name: String,
        /// Definition containing the call.
        referenced_by: String,
    },

    /// A custom function was referenced as if it were a variable.
    #[error("'{name}' is a function and must be called as %{name}(...) in '{referenced_by}'")]
    NotAVariable {
        /// The function name.
        name: String,
        /// Definition containing the reference.
        referenced_by: String,
    },

    /// A function was called with the wrong number of arguments.
    #[error("Function '%{function}' expects {expected} arguments, got {actual}")]
    FunctionArity {
        /// Function name.
        function: String,
        /// Accepted argument count, e.g. `2` or `2..=3`.
        expected: String,
        /// Supplied argument count.
        actual: usize,
    },

    /// A built-in function rejected its arguments.
    #[error("Function '%{function}' failed in {}: {message}", chain.join(" -> "))]
    FunctionArgument {
        /// Function name.
        function: String,
        /// Error message.
        message: String,
        /// Definitions being evaluated, outermost first. Custom functions are
        /// prefixed with `%`.
        chain: Vec<String>,
    },

    /// A map literal used a key that cannot be rendered as a string.
    #[error("Map keys must be strings, numbers or booleans, got {key_type} in '{definition}'")]
    InvalidMapKey {
        /// Type of the rejected key.
        key_type: &'static str,
        /// Definition containing the map literal.
        definition: String,
    },

    /// A script raised an error through `%throw` or `%assert`.
    #[error("{message} (in {})", chain.join(" -> "))]
    UserThrown {
        /// Message supplied by the script.
        message: String,
        /// Definitions being evaluated, outermost first.
        chain: Vec<String>,
    },

    /// A native value could not be converted into a script value.
    #[error("Cannot convert value for '{name}': {message}")]
    Conversion {
        /// Name the value was supplied for.
        name: String,
        /// Error message.
        message: String,
    },
}

impl ScriptError {
    /// Build a parse error for `name` from a pest error.
    pub(crate) fn parse<R: pest::RuleType>(name: &str, e: pest::error::Error<R>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };
        ScriptError::Parse {
            name: name.to_string(),
            line,
            col,
            message: e.variant.to_string(),
        }
    }
}
