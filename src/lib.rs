//! preset-script: incremental variable resolution for download presets
//!
//! preset-script evaluates a catalog of named template definitions, such as
//! `{%upper(title)} - {upload_date_standardized}`, against metadata that arrives
//! piece by piece. Variables whose inputs are not known yet resolve to
//! [`Value::Unresolvable`] instead of failing, and everything is recomputed
//! incrementally as values are supplied.
//!
//! # Features
//!
//! - **Template scripts**: literal text with `{expression}` interpolations, variables,
//!   built-in `%functions` and user-defined custom functions
//! - **Unresolvable propagation**: partial knowledge never raises; dependents wait
//! - **Incremental resolution**: memoized values, precise invalidation on change
//! - **Static validation**: cycles, undefined names and arity errors are reported
//!   before anything is evaluated
//! - **Sanitized variants**: every variable `X` gets a file-name-safe `X_sanitized`
//!
//! # Quick Start
//!
//! ```rust
//! use preset_script::{catalog::variables::FILE_NAME, Entry, Overrides, Value};
//! use serde_json::json;
//!
//! let overrides = Overrides::new([("folder", "/media/{%titlecase(uploader)}")])?;
//! let mut entry = Entry::with_overrides(
//!     json!({"id": "x1", "title": "Hello", "uploader": "some channel"}),
//!     &overrides,
//! )?;
//!
//! assert_eq!(entry.get("folder"), Some(&Value::from("/media/Some Channel")));
//! assert_eq!(entry.get(FILE_NAME), Some(&Value::Unresolvable));
//!
//! entry.set_download_extension("mp4")?;
//! assert_eq!(
//!     entry.apply_formatter("{folder}/{file_name}")?.as_deref(),
//!     Some("/media/Some Channel/Hello.mp4")
//! );
//! # Ok::<(), preset_script::ScriptError>(())
//! ```
//!
//! # Custom Catalogs
//!
//! The engine does not depend on the built-in catalog. Use [`CatalogBuilder`] to
//! define your own variables and drive them through a [`Scriptable`]:
//!
//! ```rust
//! use preset_script::{Catalog, Scriptable, Value};
//!
//! let catalog = Catalog::builder()
//!     .variable("greeting", "hello {name}")
//!     .function("twice", "{$0}{$0}")
//!     .variable("echo", "{%twice(greeting)}")
//!     .deferred("name")
//!     .build()?;
//!
//! let mut scriptable = Scriptable::from_catalog(&catalog)?;
//! assert_eq!(scriptable.get("echo"), Some(&Value::Unresolvable));
//!
//! scriptable.add([("name", "Sam")])?;
//! assert_eq!(scriptable.get("echo"), Some(&Value::from("hello Samhello Sam")));
//! # Ok::<(), preset_script::ScriptError>(())
//! ```
//!
//! # Using the Engine Directly
//!
//! [`Script`] is the resolution engine underneath. It takes the unresolvable set
//! explicitly on every call; see the [`script`] module for details.

#![warn(missing_docs)]

pub mod catalog;
mod entry;
mod overrides;
pub mod script;
mod scriptable;

// Public API exports
pub use catalog::{Catalog, CatalogBuilder, Variable};
pub use entry::Entry;
pub use overrides::Overrides;
pub use scriptable::Scriptable;

// Re-export commonly used types
pub use script::{Registry, Resolution, Script, ScriptBuilder, ScriptError, ToScript, Value};
