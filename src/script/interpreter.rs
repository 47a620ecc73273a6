//! Evaluator for variable and function templates.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use tracing::trace;

use crate::script::ast::*;
use crate::script::context::Frame;
use crate::script::error::ScriptError;
use crate::script::functions::{Conditional, FunctionRegistry, Implementation};
use crate::script::registry::{Definition, Lookup};
use crate::script::value::Value;

/// Evaluates variables for one resolution pass.
///
/// Values already in `cache` are reused unless named in `stale`. Everything
/// evaluated during the pass is collected in `computed`, including variables that
/// turned out to be unresolvable.
pub(crate) struct Evaluator<'a> {
    lookup: Lookup<'a>,
    functions: &'a FunctionRegistry,
    unresolvable: &'a BTreeSet<String>,
    cache: &'a BTreeMap<String, Value>,
    stale: &'a BTreeSet<String>,
    computed: BTreeMap<String, Value>,
    in_progress: Vec<String>,
    frame: Frame,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        lookup: Lookup<'a>,
        functions: &'a FunctionRegistry,
        unresolvable: &'a BTreeSet<String>,
        cache: &'a BTreeMap<String, Value>,
        stale: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            lookup,
            functions,
            unresolvable,
            cache,
            stale,
            computed: BTreeMap::new(),
            in_progress: Vec::new(),
            frame: Frame::default(),
        }
    }

    /// Values evaluated during this pass.
    pub(crate) fn into_computed(self) -> BTreeMap<String, Value> {
        self.computed
    }

    /// Evaluate the variable `name`, reusing earlier results where valid.
    pub(crate) fn variable(&mut self, name: &str) -> Result<Value, ScriptError> {
        if self.unresolvable.contains(name) {
            return Ok(Value::Unresolvable);
        }
        if let Some(value) = self.computed.get(name) {
            return Ok(value.clone());
        }
        if !self.stale.contains(name) {
            if let Some(value) = self.cache.get(name) {
                return Ok(value.clone());
            }
        }

        let definition = self
            .lookup
            .get(name)
            .ok_or_else(|| ScriptError::UndefinedReference {
                name: name.to_string(),
                referenced_by: self.owner(),
            })?;
        let Definition::Variable(template) = definition else {
            return Err(ScriptError::NotAVariable {
                name: name.to_string(),
                referenced_by: self.owner(),
            });
        };

        self.enter(name.to_string())?;
        let frame = std::mem::take(&mut self.frame);
        let result = self.template(template);
        self.frame = frame;
        self.in_progress.pop();

        let value = result?;
        trace!(variable = name, value = %value, "evaluated variable");
        self.computed.insert(name.to_string(), value.clone());
        Ok(value)
    }

    fn enter(&mut self, node: String) -> Result<(), ScriptError> {
        if let Some(pos) = self.in_progress.iter().position(|n| *n == node) {
            let mut cycle = self.in_progress[pos..].to_vec();
            cycle.push(node);
            return Err(ScriptError::CycleDetected { cycle });
        }
        self.in_progress.push(node);
        Ok(())
    }

    fn owner(&self) -> String {
        self.in_progress.last().cloned().unwrap_or_default()
    }

    fn template(&mut self, template: &Template) -> Result<Value, ScriptError> {
        match template.segments() {
            [Segment::Expression(expr)] => self.expression(expr),
            segments => {
                let mut rendered = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => rendered.push_str(text),
                        Segment::Expression(expr) => {
                            let value = self.expression(expr)?;
                            if value.is_unresolvable() {
                                return Ok(Value::Unresolvable);
                            }
                            // Writing to a String cannot fail
                            let _ = write!(rendered, "{}", value);
                        }
                    }
                }
                Ok(Value::String(rendered))
            }
        }
    }

    fn expression(&mut self, expr: &Expression) -> Result<Value, ScriptError> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => self.variable(name),
            Expression::Parameter(index) => {
                self.frame
                    .argument(*index)
                    .cloned()
                    .ok_or_else(|| ScriptError::UnboundParameter {
                        parameter: *index,
                        definition: self
                            .frame
                            .function()
                            .map_or_else(|| self.owner(), str::to_string),
                    })
            }
            Expression::Call(call) => self.call(call),
            Expression::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.expression(item)?;
                    if value.is_unresolvable() {
                        return Ok(Value::Unresolvable);
                    }
                    values.push(value);
                }
                Ok(Value::Array(values))
            }
            Expression::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key_expr, value_expr) in entries {
                    let key = match self.expression(key_expr)? {
                        Value::Unresolvable => return Ok(Value::Unresolvable),
                        Value::String(s) => s,
                        scalar @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
                            scalar.to_string()
                        }
                        other => {
                            return Err(ScriptError::InvalidMapKey {
                                key_type: other.type_name(),
                                definition: self.owner(),
                            })
                        }
                    };
                    let value = self.expression(value_expr)?;
                    if value.is_unresolvable() {
                        return Ok(Value::Unresolvable);
                    }
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }
    }

    /// Evaluate arguments left to right, stopping at the first unresolvable one.
    fn arguments(&mut self, args: &[Expression]) -> Result<Option<Vec<Value>>, ScriptError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.expression(arg)?;
            if value.is_unresolvable() {
                return Ok(None);
            }
            values.push(value);
        }
        Ok(Some(values))
    }

    fn call(&mut self, call: &Call) -> Result<Value, ScriptError> {
        if let Some(Definition::Function(function)) = self.lookup.get(&call.name) {
            if function.arity() != call.args.len() {
                return Err(ScriptError::FunctionArity {
                    function: call.name.clone(),
                    expected: function.arity().to_string(),
                    actual: call.args.len(),
                });
            }
            let Some(arguments) = self.arguments(&call.args)? else {
                return Ok(Value::Unresolvable);
            };

            // Swap frames for the duration of the call
            self.enter(format!("%{}", call.name))?;
            let previous = std::mem::replace(&mut self.frame, Frame::new(&call.name, arguments));
            let result = self.template(function.body());
            self.frame = previous;
            self.in_progress.pop();
            return result;
        }

        let builtin = self
            .functions
            .lookup(&call.name)
            .copied()
            .ok_or_else(|| ScriptError::UndefinedFunction {
                name: call.name.clone(),
                referenced_by: self.owner(),
            })?;
        if !builtin.arity().accepts(call.args.len()) {
            return Err(ScriptError::FunctionArity {
                function: call.name.clone(),
                expected: builtin.arity().to_string(),
                actual: call.args.len(),
            });
        }

        match builtin.implementation() {
            Implementation::Strict(function) => {
                let Some(arguments) = self.arguments(&call.args)? else {
                    return Ok(Value::Unresolvable);
                };
                function(&arguments)
                    .map_err(|e| e.into_script_error(&call.name, self.in_progress.clone()))
            }
            Implementation::Conditional(kind) => self.conditional(kind, &call.args),
        }
    }

    /// Only the branch that is selected gets evaluated.
    fn conditional(
        &mut self,
        kind: Conditional,
        args: &[Expression],
    ) -> Result<Value, ScriptError> {
        match kind {
            Conditional::If => {
                let condition = self.expression(&args[0])?;
                if condition.is_unresolvable() {
                    return Ok(Value::Unresolvable);
                }
                let branch = if condition.is_truthy() { &args[1] } else { &args[2] };
                self.expression(branch)
            }
            Conditional::Elif => {
                let malformed = args.len() % 2 == 0;
                let (default, pairs) = match args.split_last() {
                    Some(split) if !malformed => split,
                    _ => {
                        return Err(ScriptError::FunctionArgument {
                            function: "elif".to_string(),
                            message: "expected condition/value pairs followed by a default"
                                .to_string(),
                            chain: self.in_progress.clone(),
                        })
                    }
                };
                for pair in pairs.chunks(2) {
                    let condition = self.expression(&pair[0])?;
                    if condition.is_unresolvable() {
                        return Ok(Value::Unresolvable);
                    }
                    if condition.is_truthy() {
                        return self.expression(&pair[1]);
                    }
                }
                self.expression(default)
            }
            Conditional::IfPassthrough => {
                let value = self.expression(&args[0])?;
                if value.is_unresolvable() || value.is_truthy() {
                    return Ok(value);
                }
                self.expression(&args[1])
            }
        }
    }
}
