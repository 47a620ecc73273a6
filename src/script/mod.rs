//! Script definitions and the incremental resolution engine.
//!
//! A [`Script`] owns a [`Registry`] of variable and custom-function definitions and
//! resolves every variable to a [`Value`]. Variables whose dependencies are not known
//! yet are listed in an *unresolvable set* and resolve to [`Value::Unresolvable`]
//! instead of failing, as does everything that depends on them.
//!
//! Results are memoized. Adding definitions only invalidates the variables whose
//! dependency closure contains a changed name, and resolving again against the same
//! unresolvable set without intervening changes does no work at all.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use preset_script::script::{Registry, Script, Value};
//!
//! let mut registry = Registry::new();
//! registry.register("greeting", "hello {name}")?;
//! let mut script = Script::new(registry);
//!
//! let unresolvable = BTreeSet::from(["name".to_string()]);
//! let resolution = script.resolve(&unresolvable, true)?;
//! assert_eq!(resolution.get("greeting"), Some(&Value::Unresolvable));
//!
//! let mut names = Registry::new();
//! names.register("name", "Sam")?;
//! script.add(names, &BTreeSet::new())?;
//! let resolution = script.resolve(&BTreeSet::new(), true)?;
//! assert_eq!(resolution.get("greeting"), Some(&Value::from("hello Sam")));
//! # Ok::<(), preset_script::script::ScriptError>(())
//! ```

mod ast;
mod context;
mod error;
mod functions;
mod graph;
mod interpreter;
pub(crate) mod parser;
mod registry;
mod value;

pub use ast::{Call, Expression, Segment, Template};
pub use error::ScriptError;
pub use functions::{
    Arity, BuiltinFn, BuiltinFunction, Conditional, FunctionError, FunctionRegistry, Implementation,
};
pub use parser::parse_template;
pub use registry::{is_identifier, Definition, Function, Registry};
pub use value::{to_script, ToScript, Value};

use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use interpreter::Evaluator;
use registry::Lookup;

/// Values produced by one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    values: BTreeMap<String, Value>,
    evaluated: usize,
}

impl Resolution {
    /// The value of `name`, if it is a variable covered by this resolution.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All values, ordered by name.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    /// Names of the variables that resolved to [`Value::Unresolvable`].
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, value)| value.is_unresolvable())
            .map(|(name, _)| name.as_str())
    }

    /// Number of definitions evaluated during the pass. Zero when every value came
    /// from the cache.
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the resolution holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the resolution, returning its values.
    pub fn into_values(self) -> BTreeMap<String, Value> {
        self.values
    }
}

/// Incremental, memoizing resolution engine.
#[derive(Debug, Clone)]
pub struct Script {
    definitions: Registry,
    functions: Arc<FunctionRegistry>,
    cache: BTreeMap<String, Value>,
    resolved_against: Option<BTreeSet<String>>,
    dirty: bool,
}

impl Script {
    /// Create an engine over `definitions` using the built-in functions.
    pub fn new(definitions: Registry) -> Self {
        Self::builder().definitions(definitions).build()
    }

    /// Create a builder for configuring an engine.
    pub fn builder() -> ScriptBuilder {
        ScriptBuilder::new()
    }

    /// The current definitions.
    pub fn definitions(&self) -> &Registry {
        &self.definitions
    }

    /// The function registry used for built-in calls.
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// The cached value of `name` from the last updating pass.
    ///
    /// Names that were unresolvable in that pass have no cached value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.cache.get(name)
    }

    /// Whether definitions changed since the last updating pass.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Resolve every variable not named in `unresolvable`.
    ///
    /// Variables are evaluated in name order. Before anything is evaluated the
    /// dependency graph of every variable that needs evaluation is checked for cycles,
    /// undefined names and arity mismatches. With `update` set the results replace
    /// the cache; otherwise the engine is left untouched.
    pub fn resolve(
        &mut self,
        unresolvable: &BTreeSet<String>,
        update: bool,
    ) -> Result<Resolution, ScriptError> {
        if !self.dirty && self.resolved_against.as_ref() == Some(unresolvable) {
            debug!(variables = self.cache.len(), "resolution is up to date");
            return Ok(Resolution {
                values: self.snapshot(unresolvable, &BTreeMap::new(), &BTreeSet::new()),
                evaluated: 0,
            });
        }

        let stale = self.stale_entries(Lookup::new(&self.definitions), unresolvable);
        let computed = self.evaluate(Lookup::new(&self.definitions), None, unresolvable, &stale)?;
        let values = self.snapshot(unresolvable, &computed, &stale);
        let evaluated = computed.len();

        let resolution = Resolution { values, evaluated };
        debug!(
            evaluated,
            unresolved = resolution.unresolved().count(),
            update,
            "resolution pass complete"
        );

        if update {
            self.cache
                .retain(|name, _| !stale.contains(name) && !unresolvable.contains(name));
            self.cache.extend(computed);
            self.resolved_against = Some(unresolvable.clone());
            self.dirty = false;
        }
        Ok(resolution)
    }

    /// Evaluate ad-hoc `definitions` layered over the engine without changing it.
    ///
    /// The resolution holds the variables of `definitions` only. Ad-hoc definitions
    /// shadow engine definitions of the same name for the duration of the call.
    pub fn resolve_once(
        &self,
        definitions: &Registry,
        unresolvable: &BTreeSet<String>,
    ) -> Result<Resolution, ScriptError> {
        let lookup = Lookup::layered(definitions, &self.definitions);

        let mut stale = self.stale_entries(lookup, unresolvable);
        let shadowed: BTreeSet<String> = definitions
            .names()
            .filter(|name| self.definitions.contains(name))
            .map(str::to_string)
            .collect();
        if !shadowed.is_empty() {
            stale.extend(graph::affected(lookup, &shadowed));
        }

        let computed = self.evaluate(lookup, Some(definitions), unresolvable, &stale)?;
        let evaluated = computed.len();
        let values = definitions
            .variables()
            .map(|name| {
                let value = if unresolvable.contains(name) {
                    Value::Unresolvable
                } else {
                    computed.get(name).cloned().unwrap_or(Value::Unresolvable)
                };
                (name.to_string(), value)
            })
            .collect();
        Ok(Resolution { values, evaluated })
    }

    /// Merge `definitions` into the engine, overwriting existing names.
    ///
    /// Every name the new definitions reference directly must already be defined,
    /// be defined by `definitions` itself, or be in `unresolvable`. Cached values
    /// that could depend on a changed name are invalidated; re-adding identical
    /// definitions changes nothing.
    pub fn add(
        &mut self,
        definitions: Registry,
        unresolvable: &BTreeSet<String>,
    ) -> Result<(), ScriptError> {
        graph::check_references(
            Lookup::layered(&definitions, &self.definitions),
            &self.functions,
            unresolvable,
            &definitions,
        )?;

        let changed: BTreeSet<String> = definitions
            .iter()
            .filter(|(name, definition)| self.definitions.get(name) != Some(*definition))
            .map(|(name, _)| name.clone())
            .collect();
        if changed.is_empty() {
            debug!(definitions = definitions.len(), "add changed nothing");
            return Ok(());
        }

        self.definitions.extend(definitions);
        let invalidated = graph::affected(Lookup::new(&self.definitions), &changed);
        let before = self.cache.len();
        self.cache.retain(|name, _| !invalidated.contains(name));
        self.dirty = true;

        debug!(
            changed = changed.len(),
            invalidated = before - self.cache.len(),
            "definitions added"
        );
        Ok(())
    }

    /// Cache entries that the difference between `unresolvable` and the set of the
    /// last updating pass can affect.
    ///
    /// Releasing a name can only turn unresolvable entries concrete; withholding a
    /// name can only turn concrete entries unresolvable.
    fn stale_entries(
        &self,
        lookup: Lookup<'_>,
        unresolvable: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        let Some(previous) = &self.resolved_against else {
            return BTreeSet::new();
        };

        let released: BTreeSet<String> = previous.difference(unresolvable).cloned().collect();
        let withheld: BTreeSet<String> = unresolvable.difference(previous).cloned().collect();

        let mut stale = BTreeSet::new();
        if !released.is_empty() {
            stale.extend(
                graph::affected(lookup, &released)
                    .into_iter()
                    .filter(|name| self.cache.get(name).is_some_and(Value::is_unresolvable)),
            );
        }
        if !withheld.is_empty() {
            stale.extend(
                graph::affected(lookup, &withheld)
                    .into_iter()
                    .filter(|name| self.cache.get(name).is_some_and(|v| !v.is_unresolvable())),
            );
        }
        stale
    }

    /// Validate and evaluate the variables that have no valid cached value.
    ///
    /// Roots are the variables of `overlay` when given, otherwise every variable of
    /// the engine.
    fn evaluate(
        &self,
        lookup: Lookup<'_>,
        overlay: Option<&Registry>,
        unresolvable: &BTreeSet<String>,
        stale: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Value>, ScriptError> {
        let settled = |name: &str| {
            !stale.contains(name)
                && !overlay.is_some_and(|o| o.contains(name))
                && self.cache.contains_key(name)
        };
        let roots: Vec<&str> = overlay
            .unwrap_or(&self.definitions)
            .variables()
            .filter(|name| !unresolvable.contains(*name) && !settled(*name))
            .collect();

        graph::validate(lookup, &self.functions, unresolvable, roots.iter().copied(), &settled)?;

        let mut evaluator =
            Evaluator::new(lookup, &self.functions, unresolvable, &self.cache, stale);
        for root in &roots {
            evaluator.variable(root)?;
        }
        Ok(evaluator.into_computed())
    }

    /// A value for every variable of the engine.
    fn snapshot(
        &self,
        unresolvable: &BTreeSet<String>,
        computed: &BTreeMap<String, Value>,
        stale: &BTreeSet<String>,
    ) -> BTreeMap<String, Value> {
        self.definitions
            .variables()
            .map(|name| {
                let value = if unresolvable.contains(name) {
                    None
                } else {
                    computed.get(name).or_else(|| {
                        self.cache.get(name).filter(|_| !stale.contains(name))
                    })
                };
                (name.to_string(), value.cloned().unwrap_or(Value::Unresolvable))
            })
            .collect()
    }
}

/// Builder for configuring a [`Script`].
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    definitions: Registry,
    functions: Option<Arc<FunctionRegistry>>,
}

impl ScriptBuilder {
    /// Create a new script builder.
    pub fn new() -> Self {
        Self {
            definitions: Registry::new(),
            functions: None,
        }
    }

    /// Set the initial definitions.
    pub fn definitions(mut self, definitions: Registry) -> Self {
        self.definitions = definitions;
        self
    }

    /// Use a custom function registry instead of the built-in one.
    pub fn functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Build the engine. Nothing is resolved until [`Script::resolve`] is called.
    pub fn build(self) -> Script {
        Script {
            definitions: self.definitions,
            functions: self.functions.unwrap_or_else(FunctionRegistry::builtins),
            cache: BTreeMap::new(),
            resolved_against: None,
            dirty: true,
        }
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(definitions: &[(&str, &str)]) -> Registry {
        let mut registry = Registry::new();
        for (name, source) in definitions {
            registry.register(name, source).unwrap();
        }
        registry
    }

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_releasing_a_name_only_reevaluates_dependents() {
        let mut script = Script::new(registry(&[
            ("a", "{x}"),
            ("b", "{%upper('b')}"),
            ("c", "{a}-{b}"),
        ]));
        let first = script.resolve(&names(&["x"]), true).unwrap();
        assert_eq!(first.evaluated(), 3);
        assert_eq!(first.get("c"), Some(&Value::Unresolvable));

        script.add(registry(&[("x", "1")]), &names(&[])).unwrap();
        let second = script.resolve(&names(&[]), true).unwrap();
        // x, a and c; b stays cached
        assert_eq!(second.evaluated(), 3);
        assert_eq!(second.get("c"), Some(&Value::from("1-B")));
    }

    #[test]
    fn test_withholding_a_name_invalidates_concrete_dependents() {
        let mut script = Script::new(registry(&[("x", "1"), ("a", "{x}"), ("b", "2")]));
        script.resolve(&names(&[]), true).unwrap();

        let resolution = script.resolve(&names(&["x"]), true).unwrap();
        assert_eq!(resolution.get("a"), Some(&Value::Unresolvable));
        assert_eq!(resolution.get("b"), Some(&Value::from("2")));
        assert_eq!(resolution.evaluated(), 1);
        assert_eq!(script.get("x"), None);
    }

    #[test]
    fn test_read_only_resolve_leaves_cache_alone() {
        let mut script = Script::new(registry(&[("a", "1")]));
        let resolution = script.resolve(&names(&[]), false).unwrap();
        assert_eq!(resolution.get("a"), Some(&Value::from("1")));
        assert_eq!(script.get("a"), None);
        assert!(script.is_dirty());
    }

    #[test]
    fn test_resolve_once_layers_over_the_engine() {
        let mut script = Script::new(registry(&[("a", "{%int(1)}"), ("b", "{a}")]));
        script.resolve(&names(&[]), true).unwrap();

        let overlay = registry(&[("a", "{%int(2)}"), ("out", "{b}/{a}")]);
        let resolution = script.resolve_once(&overlay, &names(&[])).unwrap();
        assert_eq!(resolution.get("out"), Some(&Value::from("2/2")));
        assert_eq!(resolution.get("b"), None);
        assert_eq!(script.get("b"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_add_rejects_undefined_references() {
        let mut script = Script::new(Registry::new());
        assert_eq!(
            script.add(registry(&[("a", "{nowhere}")]), &names(&[])),
            Err(ScriptError::UndefinedReference {
                name: "nowhere".to_string(),
                referenced_by: "a".to_string()
            })
        );
        assert!(script.definitions().is_empty());
        assert_eq!(script.add(registry(&[("a", "{nowhere}")]), &names(&["nowhere"])), Ok(()));
    }
}
