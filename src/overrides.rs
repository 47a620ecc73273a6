//! Global user overrides shared by every entry of a subscription.

use tracing::debug;

use crate::catalog::Catalog;
use crate::scriptable::{value_definitions, Scriptable};
use crate::script::{Registry, ScriptError, ToScript, Value};

/// User-supplied definitions layered over the catalog.
///
/// Keys name variables; a key starting with `%` defines a custom function. Each
/// definition may reference catalog variables, other overrides, or both.
///
/// ```rust
/// use preset_script::Overrides;
///
/// let overrides = Overrides::new([
///     ("tv_show_name", "Sample Show"),
///     ("%bracketed", "[{$0}]"),
///     ("tv_show_directory", "/media/{%bracketed(tv_show_name)}"),
/// ])?;
/// assert_eq!(
///     overrides.apply_formatter("{tv_show_directory}")?.as_deref(),
///     Some("/media/[Sample Show]")
/// );
/// # Ok::<(), preset_script::ScriptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Overrides {
    catalog: Catalog,
    definitions: Registry,
    scriptable: Scriptable,
}

impl Overrides {
    /// Parse overrides against the built-in catalog.
    pub fn new<I, K, V>(pairs: I) -> Result<Self, ScriptError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_catalog(Catalog::builtin()?, pairs)
    }

    /// Parse overrides against `catalog`.
    pub fn from_catalog<I, K, V>(catalog: &Catalog, pairs: I) -> Result<Self, ScriptError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut definitions = Registry::new();
        for (name, source) in pairs {
            definitions.register(name.as_ref(), source.as_ref())?;
        }

        let mut scriptable = Scriptable::from_catalog(catalog)?;
        scriptable.add_definitions(definitions.clone())?;
        debug!(definitions = definitions.len(), "overrides parsed");
        Ok(Self {
            catalog: catalog.clone(),
            definitions,
            scriptable,
        })
    }

    /// The catalog the overrides were parsed against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The override definitions, without sanitized variants.
    pub fn definitions(&self) -> &Registry {
        &self.definitions
    }

    /// Supply concrete values, e.g. the subscription name.
    pub fn add<I, K, V>(&mut self, values: I) -> Result<(), ScriptError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToScript,
    {
        let definitions = value_definitions(values)?;
        self.scriptable.add_definitions(definitions.clone())?;
        self.definitions.extend(definitions);
        Ok(())
    }

    /// The resolved value of `name`.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&Value> {
        self.scriptable.get(name)
    }

    /// Evaluate a template and render it, or `None` while it is unresolvable.
    pub fn apply_formatter(&self, template: &str) -> Result<Option<String>, ScriptError> {
        Ok(render(self.scriptable.resolve_formatter(template)?))
    }

    /// The underlying adapter.
    pub fn scriptable(&self) -> &Scriptable {
        &self.scriptable
    }
}

pub(crate) fn render(value: Value) -> Option<String> {
    match value {
        Value::Unresolvable => None,
        value => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::variables::SUBSCRIPTION_NAME;

    #[test]
    fn test_overrides_resolve_against_each_other() {
        let overrides = Overrides::new([("a", "1"), ("b", "{a}{a}")]).unwrap();
        assert_eq!(overrides.get("b"), Some(&Value::from("11")));
        assert_eq!(overrides.get("b_sanitized"), Some(&Value::from("11")));
        assert_eq!(overrides.definitions().len(), 2);
    }

    #[test]
    fn test_entry_variables_stay_unresolvable() {
        let overrides = Overrides::new([("show", "{title} show")]).unwrap();
        assert_eq!(overrides.get("show"), Some(&Value::Unresolvable));
        assert_eq!(overrides.apply_formatter("{show}").unwrap(), None);
    }

    #[test]
    fn test_add_subscription_name() {
        let mut overrides = Overrides::new([("folder", "/media/{subscription_name}")]).unwrap();
        assert_eq!(overrides.apply_formatter("{folder}").unwrap(), None);

        overrides.add([(SUBSCRIPTION_NAME, "Sample")]).unwrap();
        assert_eq!(
            overrides.apply_formatter("{folder}").unwrap().as_deref(),
            Some("/media/Sample")
        );
        assert!(overrides.definitions().contains("subscription_name"));
        assert!(!overrides.scriptable().unresolvable().contains("subscription_name"));
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        assert!(matches!(
            Overrides::new([("x", "{undefined_thing}")]),
            Err(ScriptError::UndefinedReference { .. })
        ));
        assert!(matches!(
            Overrides::new([("x", "{y}"), ("y", "{x}")]),
            Err(ScriptError::CycleDetected { .. })
        ));
        assert!(matches!(
            Overrides::new([("bad name", "1")]),
            Err(ScriptError::InvalidName { .. })
        ));
        assert!(matches!(
            Overrides::new([("%f", "{$18446744073709551615}")]),
            Err(ScriptError::Parse { ref name, .. }) if name == "f"
        ));
    }

    #[test]
    fn test_overrides_keep_their_catalog() {
        let catalog = Catalog::builder()
            .variable("greeting", "hello {target}")
            .deferred("target")
            .build()
            .unwrap();
        let overrides =
            Overrides::from_catalog(&catalog, [("loud", "{%upper(greeting)}")]).unwrap();
        assert!(overrides.catalog().definitions().contains("greeting"));
        assert!(overrides.catalog().deferred().contains("target"));
        assert_eq!(overrides.get("loud"), Some(&Value::Unresolvable));
    }
}
