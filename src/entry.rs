//! Per-item variable context.

use tracing::debug;

use crate::catalog::variables::{ENTRY_METADATA, EXT, PLAYLIST_METADATA, SOURCE_METADATA};
use crate::catalog::{Catalog, Variable};
use crate::overrides::{render, Overrides};
use crate::scriptable::Scriptable;
use crate::script::{ScriptError, Value};

/// Variables of one downloaded item, derived from its info JSON.
///
/// ```rust
/// use preset_script::{catalog::variables::TITLE, Entry, Value};
/// use serde_json::json;
///
/// let mut entry = Entry::new(json!({"id": "abc", "title": "A/B", "upload_date": "20240131"}))?;
/// assert_eq!(entry.get(TITLE), Some(&Value::from("A/B")));
/// assert_eq!(entry.apply_formatter("{file_name}")?, None);
///
/// entry.set_download_extension("mp4")?;
/// assert_eq!(entry.apply_formatter("{file_name}")?.as_deref(), Some("A⧸B.mp4"));
/// # Ok::<(), preset_script::ScriptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Entry {
    scriptable: Scriptable,
}

impl Entry {
    /// Create an entry over the built-in catalog.
    ///
    /// `metadata` must be a JSON object.
    pub fn new(metadata: serde_json::Value) -> Result<Self, ScriptError> {
        Self::from_catalog(Catalog::builtin()?, metadata)
    }

    /// Create an entry over the catalog `overrides` were parsed against, with the
    /// overrides applied.
    pub fn with_overrides(
        metadata: serde_json::Value,
        overrides: &Overrides,
    ) -> Result<Self, ScriptError> {
        let mut scriptable = Scriptable::from_catalog(overrides.catalog())?;
        scriptable.add_definitions(overrides.definitions().clone())?;
        let mut entry = Self { scriptable };
        entry.add_metadata(ENTRY_METADATA, metadata)?;
        Ok(entry)
    }

    /// Create an entry over `catalog`.
    pub fn from_catalog(
        catalog: &Catalog,
        metadata: serde_json::Value,
    ) -> Result<Self, ScriptError> {
        let mut entry = Self {
            scriptable: Scriptable::from_catalog(catalog)?,
        };
        entry.add_metadata(ENTRY_METADATA, metadata)?;
        Ok(entry)
    }

    /// Attach the info JSON of the playlist the item belongs to.
    pub fn add_playlist_metadata(
        &mut self,
        metadata: serde_json::Value,
    ) -> Result<(), ScriptError> {
        self.add_metadata(PLAYLIST_METADATA, metadata)
    }

    /// Attach the info JSON of the item's source.
    pub fn add_source_metadata(&mut self, metadata: serde_json::Value) -> Result<(), ScriptError> {
        self.add_metadata(SOURCE_METADATA, metadata)
    }

    /// Record the extension of the downloaded file.
    pub fn set_download_extension(&mut self, ext: &str) -> Result<(), ScriptError> {
        self.scriptable.add([(EXT, ext)])
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

    /// Mutable access to the underlying adapter, e.g. to add plugin variables.
    pub fn scriptable_mut(&mut self) -> &mut Scriptable {
        &mut self.scriptable
    }

    fn add_metadata(
        &mut self,
        variable: Variable,
        metadata: serde_json::Value,
    ) -> Result<(), ScriptError> {
        if !metadata.is_object() {
            return Err(ScriptError::Conversion {
                name: variable.name().to_string(),
                message: "metadata must be a JSON object".to_string(),
            });
        }
        self.scriptable.add([(variable, metadata)])?;
        debug!(%variable, "metadata added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::variables::*;
    use serde_json::json;

    fn metadata() -> serde_json::Value {
        json!({
            "id": "abc123",
            "title": "Sample: Video",
            "uploader": "Someone",
            "upload_date": "20240131",
            "duration": 61.0,
            "playlist_index": 4,
            "description": null,
        })
    }

    #[test]
    fn test_derived_variables() {
        let entry = Entry::new(metadata()).unwrap();
        assert_eq!(entry.get(UID), Some(&Value::from("abc123")));
        assert_eq!(entry.get(TITLE), Some(&Value::from("Sample: Video")));
        assert_eq!(entry.get(TITLE_SANITIZED), Some(&Value::from("Sample： Video")));
        assert_eq!(entry.get(UPLOADER), Some(&Value::from("Someone")));
        assert_eq!(entry.get(CHANNEL), Some(&Value::from("Someone")));
        assert_eq!(entry.get(DURATION), Some(&Value::Integer(61)));
        assert_eq!(entry.get(DESCRIPTION), Some(&Value::from("")));
        assert_eq!(entry.get(UPLOAD_YEAR), Some(&Value::Integer(2024)));
        assert_eq!(entry.get(UPLOAD_MONTH), Some(&Value::Integer(1)));
        assert_eq!(entry.get(UPLOAD_DAY_PADDED), Some(&Value::from("31")));
        assert_eq!(entry.get(UPLOAD_DATE_STANDARDIZED), Some(&Value::from("2024-01-31")));
        assert_eq!(entry.get(RELEASE_YEAR), Some(&Value::Integer(2024)));
        assert_eq!(entry.get(PLAYLIST_INDEX_PADDED), Some(&Value::from("04")));
    }

    #[test]
    fn test_fallbacks_when_fields_are_missing() {
        let entry = Entry::new(json!({"id": 7})).unwrap();
        assert_eq!(entry.get(UID), Some(&Value::from("7")));
        assert_eq!(entry.get(TITLE), Some(&Value::from("7")));
        assert_eq!(entry.get(UPLOADER), Some(&Value::from("7")));
        assert_eq!(entry.get(UPLOAD_DATE), Some(&Value::from("19000101")));
        assert_eq!(entry.get(PLAYLIST_INDEX), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_malformed_fields_fall_back_to_defaults() {
        let entry = Entry::new(json!({
            "title": "no id",
            "upload_date": "NA",
            "release_date": 20240131,
            "duration": "n/a",
            "playlist_index": "first",
            "playlist_count": 1e20,
        }))
        .unwrap();
        assert_eq!(entry.get(UID), Some(&Value::from("")));
        assert_eq!(entry.get(TITLE), Some(&Value::from("no id")));
        assert_eq!(entry.get(UPLOAD_DATE), Some(&Value::from("19000101")));
        assert_eq!(entry.get(UPLOAD_YEAR), Some(&Value::Integer(1900)));
        assert_eq!(entry.get(RELEASE_DATE_STANDARDIZED), Some(&Value::from("2024-01-31")));
        assert_eq!(entry.get(DURATION), Some(&Value::Integer(0)));
        assert_eq!(entry.get(PLAYLIST_INDEX_PADDED), Some(&Value::from("01")));
        assert_eq!(entry.get(PLAYLIST_COUNT), Some(&Value::Integer(1)));

        let entry = Entry::new(json!({"id": "x", "duration": " 12.7 "})).unwrap();
        assert_eq!(entry.get(DURATION), Some(&Value::Integer(12)));
    }

    #[test]
    fn test_playlist_and_source_metadata() {
        let mut entry = Entry::new(metadata()).unwrap();
        assert_eq!(entry.get(PLAYLIST_TITLE), Some(&Value::Unresolvable));
        assert_eq!(entry.get(SOURCE_TITLE), Some(&Value::Unresolvable));

        entry
            .add_playlist_metadata(json!({"id": "pl", "title": "Playlist"}))
            .unwrap();
        assert_eq!(entry.get(PLAYLIST_TITLE), Some(&Value::from("Playlist")));
        assert_eq!(entry.get(SOURCE_TITLE), Some(&Value::Unresolvable));

        entry.add_source_metadata(json!({})).unwrap();
        assert_eq!(entry.get(SOURCE_TITLE), Some(&Value::from("Playlist")));
        assert_eq!(entry.get(SOURCE_UID), Some(&Value::from("pl")));
    }

    #[test]
    fn test_file_name_waits_for_extension() {
        let mut entry = Entry::new(metadata()).unwrap();
        assert_eq!(entry.get(FILE_NAME), Some(&Value::Unresolvable));
        assert_eq!(entry.apply_formatter("{file_name}").unwrap(), None);

        entry.set_download_extension("mkv").unwrap();
        assert_eq!(
            entry.apply_formatter("{file_name}").unwrap().as_deref(),
            Some("Sample： Video.mkv")
        );
        assert!(!entry.scriptable().unresolvable().contains("ext"));
    }

    #[test]
    fn test_overrides_are_layered() {
        let overrides = Overrides::new([
            ("title", "{%upper(%map_get(entry_metadata, \"title\"))}"),
            ("season", "{%season_episode(1, playlist_index)}"),
        ])
        .unwrap();
        let entry = Entry::with_overrides(metadata(), &overrides).unwrap();
        assert_eq!(entry.get(TITLE), Some(&Value::from("SAMPLE: VIDEO")));
        assert_eq!(entry.get(FILE_TITLE), Some(&Value::from("SAMPLE： VIDEO")));
        assert_eq!(entry.get("season"), Some(&Value::from("S01E04")));
    }

    #[test]
    fn test_overrides_over_a_custom_catalog() {
        let catalog = Catalog::builder()
            .variable("entry_id", r#"{%map_get(entry_metadata, "id")}"#)
            .deferred("entry_metadata")
            .build()
            .unwrap();
        let overrides = Overrides::from_catalog(&catalog, [("label", "#{entry_id}")]).unwrap();
        let entry = Entry::with_overrides(json!({"id": "abc"}), &overrides).unwrap();
        assert_eq!(entry.get("entry_id"), Some(&Value::from("abc")));
        assert_eq!(entry.get("label"), Some(&Value::from("#abc")));
        assert_eq!(entry.get(TITLE), None);
    }

    #[test]
    fn test_metadata_must_be_an_object() {
        let err = Entry::new(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Conversion { ref name, .. } if name == "entry_metadata"
        ));

        let mut entry = Entry::new(metadata()).unwrap();
        assert!(entry.add_playlist_metadata(json!("nope")).is_err());
    }
}
