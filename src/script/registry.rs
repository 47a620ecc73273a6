//! Named variable and custom-function definitions.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::script::ast::Template;
use crate::script::error::ScriptError;
use crate::script::parser;
use crate::script::value::Value;

/// A custom function: a template evaluated once per call site with `$0`, `$1`, ...
/// bound to the call's arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    body: Template,
    arity: usize,
}

impl Function {
    /// Create a function from its body. The arity is one more than the highest
    /// parameter index the body uses.
    pub fn new(body: Template) -> Self {
        let arity = body.max_parameter().map_or(0, |max| max.saturating_add(1));
        Self { body, arity }
    }

    /// The function body.
    pub fn body(&self) -> &Template {
        &self.body
    }

    /// Number of arguments the function takes.
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// A named definition. Variables and custom functions share one namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// Zero-argument template, evaluated at most once per resolution pass.
    Variable(Template),
    /// Parameterized template, evaluated fresh at every call.
    Function(Function),
}

impl Definition {
    /// Parse a variable definition. Parameters are not allowed in variables.
    pub fn variable(name: &str, source: &str) -> Result<Self, ScriptError> {
        let template = parser::parse_definition(name, source)?;
        if let Some(parameter) = template.max_parameter() {
            return Err(ScriptError::UnboundParameter {
                parameter,
                definition: name.to_string(),
            });
        }
        Ok(Definition::Variable(template))
    }

    /// Parse a custom function definition.
    pub fn function(name: &str, source: &str) -> Result<Self, ScriptError> {
        let template = parser::parse_definition(name, source)?;
        Ok(Definition::Function(Function::new(template)))
    }

    /// A variable whose value is already known.
    pub fn value(value: Value) -> Self {
        Definition::Variable(Template::constant(value))
    }

    /// The template evaluated for this definition.
    pub fn template(&self) -> &Template {
        match self {
            Definition::Variable(template) => template,
            Definition::Function(function) => function.body(),
        }
    }

    /// Whether this is a custom function.
    pub fn is_function(&self) -> bool {
        matches!(self, Definition::Function(_))
    }
}

/// Whether `name` is a valid variable or function name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

/// Mapping from name to [`Definition`], ordered by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Registry {
    definitions: BTreeMap<String, Definition>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        definition: Definition,
    ) -> Option<Definition> {
        self.definitions.insert(name.into(), definition)
    }

    /// Parse and insert a definition from its source.
    ///
    /// A name starting with `%` defines a custom function; any other name defines a
    /// variable.
    pub fn register(
        &mut self,
        name: &str,
        source: &str,
    ) -> Result<Option<Definition>, ScriptError> {
        let (bare, is_function) = match name.strip_prefix('%') {
            Some(bare) => (bare, true),
            None => (name, false),
        };
        if !is_identifier(bare) {
            return Err(ScriptError::InvalidName {
                name: name.to_string(),
            });
        }

        let definition = if is_function {
            Definition::function(bare, source)?
        } else {
            Definition::variable(bare, source)?
        };
        Ok(self.insert(bare, definition))
    }

    /// Look up a definition.
    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Whether `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// All definitions, ordered by name.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Definition> {
        self.definitions.iter()
    }

    /// Names of all variables (not functions), sorted.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .filter(|(_, definition)| !definition.is_function())
            .map(|(name, _)| name.as_str())
    }

    /// Names of all custom functions, sorted.
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .filter(|(_, definition)| definition.is_function())
            .map(|(name, _)| name.as_str())
    }

    /// All names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Extend<(String, Definition)> for Registry {
    fn extend<T: IntoIterator<Item = (String, Definition)>>(&mut self, iter: T) {
        self.definitions.extend(iter);
    }
}

impl FromIterator<(String, Definition)> for Registry {
    fn from_iter<T: IntoIterator<Item = (String, Definition)>>(iter: T) -> Self {
        Self {
            definitions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Registry {
    type Item = (String, Definition);
    type IntoIter = btree_map::IntoIter<String, Definition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = (&'a String, &'a Definition);
    type IntoIter = btree_map::Iter<'a, String, Definition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}

/// Name resolution over an engine's registry, optionally shadowed by ad-hoc
/// definitions that are not part of the engine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lookup<'a> {
    overlay: Option<&'a Registry>,
    base: &'a Registry,
}

impl<'a> Lookup<'a> {
    pub(crate) fn new(base: &'a Registry) -> Self {
        Self {
            overlay: None,
            base,
        }
    }

    pub(crate) fn layered(overlay: &'a Registry, base: &'a Registry) -> Self {
        Self {
            overlay: Some(overlay),
            base,
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&'a Definition> {
        self.overlay
            .and_then(|overlay| overlay.get(name))
            .or_else(|| self.base.get(name))
    }

    /// Every visible definition. Order is unspecified.
    pub(crate) fn iter(self) -> impl Iterator<Item = (&'a str, &'a Definition)> {
        let overlay = self.overlay;
        self.base
            .iter()
            .filter(move |(name, _)| !overlay.is_some_and(|o| o.contains(name)))
            .chain(overlay.into_iter().flat_map(Registry::iter))
            .map(|(name, definition)| (name.as_str(), definition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("title"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("has-dash"));
    }

    #[test]
    fn test_register_variable_and_function() {
        let mut registry = Registry::new();
        registry.register("greeting", "hello {name}").unwrap();
        registry.register("%wrap", "[{$0}]({$1})").unwrap();

        assert_eq!(registry.variables().collect::<Vec<_>>(), vec!["greeting"]);
        assert_eq!(registry.functions().collect::<Vec<_>>(), vec!["wrap"]);
        let Some(Definition::Function(wrap)) = registry.get("wrap") else {
            panic!("wrap should be a function");
        };
        assert_eq!(wrap.arity(), 2);
    }

    #[test]
    fn test_register_rejects_huge_parameter_index() {
        let mut registry = Registry::new();
        let err = registry.register("%f", "{$18446744073709551615}").unwrap_err();
        assert!(matches!(err, ScriptError::Parse { ref name, .. } if name == "f"));
        let err = registry.register("%f", "{$256}").unwrap_err();
        assert!(matches!(err, ScriptError::Parse { .. }));

        registry.register("%f", "{$255}").unwrap();
        let Some(Definition::Function(f)) = registry.get("f") else {
            panic!("f should be a function");
        };
        assert_eq!(f.arity(), 256);
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = Registry::new();
        registry.register("x", "1").unwrap();
        let previous = registry.register("x", "2").unwrap();
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.register("bad name", "x"),
            Err(ScriptError::InvalidName {
                name: "bad name".to_string()
            })
        );
        assert_eq!(
            registry.register("uses_param", "{$1}"),
            Err(ScriptError::UnboundParameter {
                parameter: 1,
                definition: "uses_param".to_string()
            })
        );
        assert!(matches!(
            registry.register("broken", "{oops"),
            Err(ScriptError::Parse { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_value_definitions_compare_structurally() {
        assert_eq!(
            Definition::value(Value::Integer(1)),
            Definition::value(Value::Integer(1))
        );
        assert_ne!(
            Definition::value(Value::Integer(1)),
            Definition::value(Value::Float(1.0))
        );
    }
}
