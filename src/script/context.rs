//! Call frame binding custom-function arguments.

use crate::script::value::Value;

/// Arguments of the custom function currently being evaluated.
///
/// Variables are always evaluated under an empty frame, so `$n` inside a variable
/// can never observe the arguments of whichever function happened to reference it.
#[derive(Debug, Default)]
pub struct Frame {
    function: Option<String>,
    arguments: Vec<Value>,
}

impl Frame {
    /// Create a frame for a call to `function`.
    pub fn new(function: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            function: Some(function.into()),
            arguments,
        }
    }

    /// The argument bound to `$index`.
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Name of the function this frame belongs to.
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }
}
