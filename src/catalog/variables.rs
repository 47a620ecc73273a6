//! Built-in variable scripts and typed handles for them.

use std::fmt;

/// Typed handle for a catalog variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    name: &'static str,
}

impl Variable {
    /// Create a handle for the variable `name`.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// The variable's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl AsRef<str> for Variable {
    fn as_ref(&self) -> &str {
        self.name
    }
}

/// Raw info JSON of the downloaded item.
pub const ENTRY_METADATA: Variable = Variable::new("entry_metadata");
/// Info JSON of the playlist the item belongs to.
pub const PLAYLIST_METADATA: Variable = Variable::new("playlist_metadata");
/// Info JSON of the source (channel, collection) the item belongs to.
pub const SOURCE_METADATA: Variable = Variable::new("source_metadata");
/// Extension of the downloaded file, known once the download finished.
pub const EXT: Variable = Variable::new("ext");
/// Name of the subscription the item is downloaded for.
pub const SUBSCRIPTION_NAME: Variable = Variable::new("subscription_name");

/// Unique id of the item.
pub const UID: Variable = Variable::new("uid");
/// Extractor that produced the metadata.
pub const EXTRACTOR: Variable = Variable::new("extractor");
/// Title of the item.
pub const TITLE: Variable = Variable::new("title");
/// Title of the item, safe to use in a file name.
pub const TITLE_SANITIZED: Variable = Variable::new("title_sanitized");
/// Description of the item.
pub const DESCRIPTION: Variable = Variable::new("description");
/// URL of the item's web page.
pub const WEBPAGE_URL: Variable = Variable::new("webpage_url");
/// Id of the uploader.
pub const UPLOADER_ID: Variable = Variable::new("uploader_id");
/// Name of the uploader.
pub const UPLOADER: Variable = Variable::new("uploader");
/// URL of the uploader's page.
pub const UPLOADER_URL: Variable = Variable::new("uploader_url");
/// Channel name.
pub const CHANNEL: Variable = Variable::new("channel");
/// Channel id.
pub const CHANNEL_ID: Variable = Variable::new("channel_id");
/// Duration in seconds.
pub const DURATION: Variable = Variable::new("duration");
/// Upload date as `YYYYMMDD`.
pub const UPLOAD_DATE: Variable = Variable::new("upload_date");
/// Upload year.
pub const UPLOAD_YEAR: Variable = Variable::new("upload_year");
/// Last two digits of the upload year.
pub const UPLOAD_YEAR_TRUNCATED: Variable = Variable::new("upload_year_truncated");
/// Upload month, zero padded.
pub const UPLOAD_MONTH_PADDED: Variable = Variable::new("upload_month_padded");
/// Upload day, zero padded.
pub const UPLOAD_DAY_PADDED: Variable = Variable::new("upload_day_padded");
/// Upload month.
pub const UPLOAD_MONTH: Variable = Variable::new("upload_month");
/// Upload day.
pub const UPLOAD_DAY: Variable = Variable::new("upload_day");
/// Upload date as `YYYY-MM-DD`.
pub const UPLOAD_DATE_STANDARDIZED: Variable = Variable::new("upload_date_standardized");
/// Release date as `YYYYMMDD`, falling back to the upload date.
pub const RELEASE_DATE: Variable = Variable::new("release_date");
/// Release year.
pub const RELEASE_YEAR: Variable = Variable::new("release_year");
/// Release date as `YYYY-MM-DD`.
pub const RELEASE_DATE_STANDARDIZED: Variable = Variable::new("release_date_standardized");
/// Title of the playlist.
pub const PLAYLIST_TITLE: Variable = Variable::new("playlist_title");
/// Id of the playlist.
pub const PLAYLIST_UID: Variable = Variable::new("playlist_uid");
/// One-based position of the item in its playlist.
pub const PLAYLIST_INDEX: Variable = Variable::new("playlist_index");
/// Number of items in the playlist.
pub const PLAYLIST_COUNT: Variable = Variable::new("playlist_count");
/// Playlist index, zero padded to two digits.
pub const PLAYLIST_INDEX_PADDED: Variable = Variable::new("playlist_index_padded");
/// Title of the source.
pub const SOURCE_TITLE: Variable = Variable::new("source_title");
/// Id of the source.
pub const SOURCE_UID: Variable = Variable::new("source_uid");
/// File name stem for the item.
pub const FILE_TITLE: Variable = Variable::new("file_title");
/// Full file name of the downloaded item.
pub const FILE_NAME: Variable = Variable::new("file_name");
/// Extension used for thumbnails.
pub const THUMBNAIL_EXT: Variable = Variable::new("thumbnail_ext");
/// Extension used for info JSON files.
pub const INFO_JSON_EXT: Variable = Variable::new("info_json_ext");

/// Variables that cannot be known when an entry is created.
pub(super) const DEFERRED: &[Variable] = &[
    ENTRY_METADATA,
    PLAYLIST_METADATA,
    SOURCE_METADATA,
    EXT,
    SUBSCRIPTION_NAME,
];

pub(super) const SCRIPTS: &[(Variable, &str)] = &[
    (UID, r#"{%string(%map_get(entry_metadata, "id", ""))}"#),
    (
        EXTRACTOR,
        concat!(
            r#"{%map_get_non_empty(entry_metadata, "extractor_key", "#,
            r#"%map_get(entry_metadata, "extractor", ""))}"#,
        ),
    ),
    (TITLE, r#"{%string(%map_get_non_empty(entry_metadata, "title", uid))}"#),
    (DESCRIPTION, r#"{%map_get(entry_metadata, "description", "")}"#),
    (WEBPAGE_URL, r#"{%map_get(entry_metadata, "webpage_url", "")}"#),
    (UPLOADER_ID, r#"{%string(%map_get_non_empty(entry_metadata, "uploader_id", uid))}"#),
    (UPLOADER, r#"{%default_if_empty(%map_get(entry_metadata, "uploader", ""), uploader_id)}"#),
    (UPLOADER_URL, r#"{%map_get_non_empty(entry_metadata, "uploader_url", webpage_url)}"#),
    (CHANNEL, r#"{%map_get_non_empty(entry_metadata, "channel", uploader)}"#),
    (CHANNEL_ID, r#"{%string(%map_get_non_empty(entry_metadata, "channel_id", uploader_id))}"#),
    (DURATION, r#"{%int_or_default(%map_get(entry_metadata, "duration", 0), 0)}"#),
    (
        UPLOAD_DATE,
        r#"{%date_or_default(%map_get(entry_metadata, "upload_date", ""), "19000101")}"#,
    ),
    (UPLOAD_YEAR, "{%int(%slice(upload_date, 0, 4))}"),
    (UPLOAD_YEAR_TRUNCATED, "{%int(%slice(upload_date, 2, 4))}"),
    (UPLOAD_MONTH_PADDED, "{%slice(upload_date, 4, 6)}"),
    (UPLOAD_DAY_PADDED, "{%slice(upload_date, 6, 8)}"),
    (UPLOAD_MONTH, "{%int(upload_month_padded)}"),
    (UPLOAD_DAY, "{%int(upload_day_padded)}"),
    (UPLOAD_DATE_STANDARDIZED, "{%date_standardized(upload_date)}"),
    (
        RELEASE_DATE,
        r#"{%date_or_default(%map_get(entry_metadata, "release_date", ""), upload_date)}"#,
    ),
    (RELEASE_YEAR, "{%int(%slice(release_date, 0, 4))}"),
    (RELEASE_DATE_STANDARDIZED, "{%date_standardized(release_date)}"),
    (PLAYLIST_TITLE, r#"{%map_get_non_empty(playlist_metadata, "title", title)}"#),
    (PLAYLIST_UID, r#"{%string(%map_get_non_empty(playlist_metadata, "id", uid))}"#),
    (
        PLAYLIST_INDEX,
        r#"{%int_or_default(%map_get(entry_metadata, "playlist_index", 1), 1)}"#,
    ),
    (
        PLAYLIST_COUNT,
        r#"{%int_or_default(%map_get(entry_metadata, "playlist_count", 1), 1)}"#,
    ),
    (PLAYLIST_INDEX_PADDED, "{%pad_zero(playlist_index, 2)}"),
    (SOURCE_TITLE, r#"{%map_get_non_empty(source_metadata, "title", playlist_title)}"#),
    (SOURCE_UID, r#"{%string(%map_get_non_empty(source_metadata, "id", playlist_uid))}"#),
    (FILE_TITLE, "{%truncate(title_sanitized, 200)}"),
    (FILE_NAME, "{file_title}.{ext}"),
    (THUMBNAIL_EXT, "jpg"),
    (INFO_JSON_EXT, "info.json"),
];
