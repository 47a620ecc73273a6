//! Abstract Syntax Tree (AST) definitions for script templates.

use std::collections::BTreeSet;

use crate::script::value::Value;

/// A parsed definition: literal text interleaved with `{expression}` interpolations.
///
/// A template made of exactly one interpolation evaluates to the typed value of
/// that expression. Any other template evaluates to a string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

/// A piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text, already unescaped.
    Literal(String),
    /// Interpolated expression: `{...}`
    Expression(Expression),
}

/// An expression that evaluates to a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value: `"text"`, `42`, `3.5`, `True`
    Literal(Value),
    /// Variable reference: `title`
    Variable(String),
    /// Custom function parameter: `$0`
    Parameter(usize),
    /// Function call: `%concat(a, b)`
    Call(Call),
    /// Array literal: `[a, b]`
    Array(Vec<Expression>),
    /// Map literal: `{"key": value}`
    Map(Vec<(Expression, Expression)>),
}

/// Function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Function name, without the leading `%`.
    pub name: String,
    /// Arguments.
    pub args: Vec<Expression>,
}

impl Call {
    /// Create a new call.
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl Template {
    /// Create a template from its segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// A template that evaluates to `value`.
    pub fn constant(value: Value) -> Self {
        Self::expression(Expression::Literal(value))
    }

    /// A template consisting of a single interpolated expression.
    pub fn expression(expression: Expression) -> Self {
        Self {
            segments: vec![Segment::Expression(expression)],
        }
    }

    /// The template's segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of all variables referenced anywhere in the template.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.visit(&mut |expr| {
            if let Expression::Variable(name) = expr {
                names.insert(name.as_str());
            }
        });
        names
    }

    /// Every function call in the template as `(name, argument count)`, in source order.
    pub fn calls(&self) -> Vec<(&str, usize)> {
        let mut calls = Vec::new();
        self.visit(&mut |expr| {
            if let Expression::Call(call) = expr {
                calls.push((call.name.as_str(), call.args.len()));
            }
        });
        calls
    }

    /// Highest parameter index used, if any.
    pub fn max_parameter(&self) -> Option<usize> {
        let mut max = None;
        self.visit(&mut |expr| {
            if let Expression::Parameter(index) = expr {
                max = Some(max.map_or(*index, |m: usize| m.max(*index)));
            }
        });
        max
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expression)) {
        for segment in &self.segments {
            if let Segment::Expression(expr) = segment {
                expr.visit(f);
            }
        }
    }
}

impl Expression {
    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expression)) {
        f(self);
        match self {
            Expression::Call(call) => {
                for arg in &call.args {
                    arg.visit(f);
                }
            }
            Expression::Array(items) => {
                for item in items {
                    item.visit(f);
                }
            }
            Expression::Map(entries) => {
                for (key, value) in entries {
                    key.visit(f);
                    value.visit(f);
                }
            }
            Expression::Literal(_) | Expression::Variable(_) | Expression::Parameter(_) => {}
        }
    }
}
