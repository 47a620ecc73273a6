//! Immutable catalogs of variable and custom-function definitions.
//!
//! A [`Catalog`] is a template: it is built and validated once, then every engine
//! receives its own copy through [`Catalog::instantiate`]. Nothing can mutate a
//! catalog after [`CatalogBuilder::build`] returns.
//!
//! Building a catalog registers a *sanitized variant* for every variable: `X` gains
//! a sibling `X_sanitized` defined as `{%sanitize(X)}`, safe to use as a file name.

mod functions;
pub mod variables;

pub use variables::Variable;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use tracing::debug;

use crate::script::{Call, Definition, Expression, Registry, Script, ScriptError, Template};

/// Default suffix of sanitized variants.
pub const SANITIZED_SUFFIX: &str = "_sanitized";

static BUILTIN: LazyLock<Result<Catalog, ScriptError>> =
    LazyLock::new(|| CatalogBuilder::new().with_builtin_scripts().build());

/// Validated, immutable set of definitions shared by many engines.
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Registry,
    deferred: BTreeSet<String>,
    sanitized_suffix: String,
}

impl Catalog {
    /// The built-in catalog, parsed and validated on first use.
    pub fn builtin() -> Result<&'static Catalog, ScriptError> {
        BUILTIN.as_ref().map_err(Clone::clone)
    }

    /// Create a builder for a custom catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// An owned copy of the definitions for a new engine.
    pub fn instantiate(&self) -> Registry {
        self.definitions.clone()
    }

    /// The catalog's definitions.
    pub fn definitions(&self) -> &Registry {
        &self.definitions
    }

    /// Names that are inherently unknown when an engine is created.
    pub fn deferred(&self) -> &BTreeSet<String> {
        &self.deferred
    }

    /// Suffix appended to the names of sanitized variants.
    pub fn sanitized_suffix(&self) -> &str {
        &self.sanitized_suffix
    }
}

/// Builder for a [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    variables: Vec<(String, String)>,
    functions: Vec<(String, String)>,
    deferred: BTreeSet<String>,
    sanitized_suffix: String,
}

impl CatalogBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            functions: Vec::new(),
            deferred: BTreeSet::new(),
            sanitized_suffix: SANITIZED_SUFFIX.to_string(),
        }
    }

    /// Add the built-in variable and custom-function scripts and deferred names.
    pub fn with_builtin_scripts(mut self) -> Self {
        for (variable, source) in variables::SCRIPTS {
            self = self.variable(variable.name(), *source);
        }
        for (name, source) in functions::SCRIPTS {
            self = self.function(*name, *source);
        }
        for variable in variables::DEFERRED {
            self = self.deferred(variable.name());
        }
        self
    }

    /// Define a variable. Later definitions of the same name win.
    pub fn variable(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.variables.push((name.into(), source.into()));
        self
    }

    /// Define a custom function, named without the leading `%`.
    pub fn function(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.functions.push((name.into(), source.into()));
        self
    }

    /// Declare a name that is unknown until supplied later.
    pub fn deferred(mut self, name: impl Into<String>) -> Self {
        self.deferred.insert(name.into());
        self
    }

    /// Set the suffix of sanitized variants. An empty suffix disables them.
    pub fn sanitized_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.sanitized_suffix = suffix.into();
        self
    }

    /// Parse, sanitize and validate the definitions.
    ///
    /// Fails on parse errors, invalid names, and on anything a resolution pass with
    /// every deferred name withheld would reject (cycles, undefined names, arity).
    pub fn build(self) -> Result<Catalog, ScriptError> {
        let mut registry = Registry::new();
        for (name, source) in &self.variables {
            registry.register(name, source)?;
        }
        for (name, source) in &self.functions {
            registry.register(&format!("%{}", name), source)?;
        }
        let registry = with_sanitized_variants(registry, &self.sanitized_suffix);

        Script::new(registry.clone()).resolve(&self.deferred, false)?;
        debug!(
            variables = registry.variables().count(),
            functions = registry.functions().count(),
            deferred = self.deferred.len(),
            "catalog built"
        );

        Ok(Catalog {
            definitions: registry,
            deferred: self.deferred,
            sanitized_suffix: self.sanitized_suffix,
        })
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Register `{%sanitize(X)}` as `X` + `suffix` for every variable `X` of `registry`
/// that is not itself a sanitized variant.
pub fn with_sanitized_variants(mut registry: Registry, suffix: &str) -> Registry {
    if suffix.is_empty() {
        return registry;
    }
    let variants: Vec<(String, Definition)> = registry
        .variables()
        .filter(|name| !name.ends_with(suffix))
        .map(|name| {
            let call = Call::new("sanitize", vec![Expression::Variable(name.to_string())]);
            (
                format!("{}{}", name, suffix),
                Definition::Variable(Template::expression(Expression::Call(call))),
            )
        })
        .collect();
    registry.extend(variants);
    registry
}
