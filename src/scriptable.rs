//! Adapter that lets an entity own a [`Script`] engine.
//!
//! A [`Scriptable`] starts from a [`Catalog`] with every deferred name unresolvable.
//! Supplying a value for a name moves it out of the unresolvable set for good, and
//! the engine is brought up to date after every change so that reads never see a
//! stale cache.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::catalog::{self, Catalog};
use crate::script::{is_identifier, Definition, Registry, Script, ScriptError, ToScript, Value};

/// Name of the transient variable a formatter is evaluated as. It is not a valid
/// identifier, so it never collides with a definition.
const FORMATTER: &str = "<formatter>";

static UNRESOLVABLE: Value = Value::Unresolvable;

/// A [`Script`] together with the names it cannot resolve yet.
#[derive(Debug, Clone)]
pub struct Scriptable {
    script: Script,
    unresolvable: BTreeSet<String>,
    sanitized_suffix: String,
}

impl Scriptable {
    /// Create an adapter over the built-in catalog.
    pub fn new() -> Result<Self, ScriptError> {
        Self::from_catalog(Catalog::builtin()?)
    }

    /// Create an adapter over `catalog`, with its deferred names unresolvable.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self, ScriptError> {
        let mut scriptable = Self {
            script: Script::new(catalog.instantiate()),
            unresolvable: catalog.deferred().clone(),
            sanitized_suffix: catalog.sanitized_suffix().to_string(),
        };
        scriptable.update_script()?;
        Ok(scriptable)
    }

    /// Bring the engine's cache up to date with the current unresolvable set.
    ///
    /// Cheap when nothing changed since the last call.
    pub fn update_script(&mut self) -> Result<(), ScriptError> {
        self.script.resolve(&self.unresolvable, true)?;
        Ok(())
    }

    /// Supply concrete values.
    ///
    /// Every value is converted before anything changes; a conversion failure names
    /// the offending key. Each name leaves the unresolvable set and gains a sanitized
    /// variant.
    pub fn add<I, K, V>(&mut self, values: I) -> Result<(), ScriptError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToScript,
    {
        self.add_definitions(value_definitions(values)?)
    }

    /// Supply script definitions, with the same contract as [`Scriptable::add`].
    #[instrument(skip_all, fields(definitions = definitions.len()))]
    pub fn add_definitions(&mut self, definitions: Registry) -> Result<(), ScriptError> {
        let mut unresolvable = self.unresolvable.clone();
        for name in definitions.names() {
            unresolvable.remove(name);
        }

        let definitions = catalog::with_sanitized_variants(definitions, &self.sanitized_suffix);
        self.script.add(definitions, &unresolvable)?;
        let released = self.unresolvable.len() - unresolvable.len();
        self.unresolvable = unresolvable;
        debug!(released, remaining = self.unresolvable.len(), "definitions supplied");
        self.update_script()
    }

    /// The resolved value of `name`.
    ///
    /// Names that are still unresolvable yield [`Value::Unresolvable`]; unknown names
    /// yield `None`.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&Value> {
        let name = name.as_ref();
        if self.unresolvable.contains(name) {
            return Some(&UNRESOLVABLE);
        }
        self.script.get(name)
    }

    /// Names that cannot be resolved yet.
    pub fn unresolvable(&self) -> &BTreeSet<String> {
        &self.unresolvable
    }

    /// The underlying engine.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Evaluate an ad-hoc template against the current state without changing it.
    pub fn resolve_formatter(&self, template: &str) -> Result<Value, ScriptError> {
        let mut formatter = Registry::new();
        formatter.insert(FORMATTER, Definition::variable(FORMATTER, template)?);
        let resolution = self.script.resolve_once(&formatter, &self.unresolvable)?;
        Ok(resolution
            .into_values()
            .remove(FORMATTER)
            .unwrap_or(Value::Unresolvable))
    }
}

/// Convert native values into constant definitions.
pub(crate) fn value_definitions<I, K, V>(values: I) -> Result<Registry, ScriptError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: ToScript,
{
    values
        .into_iter()
        .map(|(key, value)| {
            let name = key.as_ref();
            if !is_identifier(name) {
                return Err(ScriptError::InvalidName {
                    name: name.to_string(),
                });
            }
            let value = value.to_script().map_err(|message| ScriptError::Conversion {
                name: name.to_string(),
                message,
            })?;
            Ok((name.to_string(), Definition::value(value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builder()
            .variable("greeting", "hello {name}")
            .variable("shout", "{%upper(greeting)}")
            .deferred("name")
            .build()
            .unwrap()
    }

    #[test]
    fn test_deferred_names_start_unresolvable() {
        let scriptable = Scriptable::from_catalog(&catalog()).unwrap();
        assert!(scriptable.unresolvable().contains("name"));
        assert_eq!(scriptable.get("name"), Some(&Value::Unresolvable));
        assert_eq!(scriptable.get("shout"), Some(&Value::Unresolvable));
        assert_eq!(scriptable.get("missing"), None);
    }

    #[test]
    fn test_add_releases_names_and_registers_variants() {
        let mut scriptable = Scriptable::from_catalog(&catalog()).unwrap();
        scriptable.add([("name", "a/b")]).unwrap();

        assert!(scriptable.unresolvable().is_empty());
        assert_eq!(scriptable.get("greeting"), Some(&Value::from("hello a/b")));
        assert_eq!(scriptable.get("shout"), Some(&Value::from("HELLO A/B")));
        assert_eq!(scriptable.get("name_sanitized"), Some(&Value::from("a⧸b")));
        assert_eq!(scriptable.get("greeting_sanitized"), Some(&Value::from("hello a⧸b")));
    }

    #[test]
    fn test_conversion_error_changes_nothing() {
        let mut scriptable = Scriptable::from_catalog(&catalog()).unwrap();
        let err = scriptable.add([("name", f64::NAN)]).unwrap_err();
        assert!(matches!(err, ScriptError::Conversion { ref name, .. } if name == "name"));
        assert!(scriptable.unresolvable().contains("name"));
        assert!(!scriptable.script().definitions().contains("name"));
    }

    #[test]
    fn test_function_error_names_the_failing_variable() {
        let catalog = Catalog::builder()
            .variable("count", "{%int(raw)}")
            .deferred("raw")
            .build()
            .unwrap();
        let mut scriptable = Scriptable::from_catalog(&catalog).unwrap();
        let err = scriptable.add([("raw", "NA")]).unwrap_err();
        match &err {
            ScriptError::FunctionArgument { function, chain, .. } => {
                assert_eq!(function, "int");
                assert_eq!(chain.last().map(String::as_str), Some("count"));
            }
            other => panic!("Expected a function error, got {:?}", other),
        }
        assert!(err.to_string().contains("count"), "{}", err);
    }

    #[test]
    fn test_add_rejects_invalid_names() {
        let mut scriptable = Scriptable::from_catalog(&catalog()).unwrap();
        let err = scriptable.add([("not a name", 1)]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidName { .. }));
    }

    #[test]
    fn test_resolve_formatter_leaves_state_untouched() {
        let mut scriptable = Scriptable::from_catalog(&catalog()).unwrap();
        assert_eq!(
            scriptable.resolve_formatter("{shout}!").unwrap(),
            Value::Unresolvable
        );

        scriptable.add([("name", "Sam")]).unwrap();
        let before = scriptable.script().definitions().clone();
        assert_eq!(
            scriptable.resolve_formatter("{shout}!").unwrap(),
            Value::from("HELLO SAM!")
        );
        assert_eq!(scriptable.resolve_formatter("{%len(name)}").unwrap(), Value::Integer(3));
        assert_eq!(scriptable.script().definitions(), &before);
    }

    #[test]
    fn test_resolve_formatter_rejects_undefined_names() {
        let scriptable = Scriptable::from_catalog(&catalog()).unwrap();
        let err = scriptable.resolve_formatter("{nope}").unwrap_err();
        assert!(matches!(err, ScriptError::UndefinedReference { ref name, .. } if name == "nope"));
    }
}
