//! Conversion of vendor records into canonical entities.
//!
//! Every conversion returns `Option`: `None` means the record is unusable
//! and the caller drops it from the result. It is never an error.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use unidrive_common::{Entity, Permission, VersionRecord};

/// Mime type callers pass to `create_file` to ask for a folder.
pub const FOLDER_MIME_TYPE: &str = "inode/directory";

/// Vendor record that may map to a canonical entity.
pub trait IntoEntity {
    fn into_entity(self) -> Option<Entity>;
}

/// Vendor record that may map to a permission.
pub trait IntoPermission {
    fn into_permission(self) -> Option<Permission>;
}

/// Vendor record that may map to a version record.
pub trait IntoVersion {
    fn into_version(self) -> Option<VersionRecord>;
}

/// Record type for capabilities a provider does not offer.
#[derive(Debug)]
pub enum NoRecord {}

impl IntoEntity for NoRecord {
    fn into_entity(self) -> Option<Entity> {
        match self {}
    }
}

impl IntoPermission for NoRecord {
    fn into_permission(self) -> Option<Permission> {
        match self {}
    }
}

impl IntoVersion for NoRecord {
    fn into_version(self) -> Option<VersionRecord> {
        match self {}
    }
}

/// Size reported either as a JSON number or as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeField {
    Number(u64),
    Text(String),
}

impl SizeField {
    /// Parsed size; `None` for text that is not a number.
    pub fn value(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// True for the canonical folder type and the vendor folder types.
pub fn is_folder_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        FOLDER_MIME_TYPE | "application/vnd.google-apps.folder" | "application/x-directory"
    )
}

/// Drop absent and blank strings.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an optional RFC 3339 timestamp.
///
/// The outer `None` means the value was present but unparsable, which makes
/// the whole record unusable. An absent value is `Some(None)`.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<Option<DateTime<Utc>>> {
    match raw {
        None => Some(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Some(dt.with_timezone(&Utc))),
    }
}

/// Guess a mime type from the file name's extension; empty when unknown.
pub(crate) fn mime_from_name(name: &str) -> String {
    extension_of(name)
        .and_then(|ext| mime_guess::from_ext(&ext).first_raw())
        .unwrap_or_default()
        .to_string()
}

/// The part of `name` after its last dot, if it has one.
///
/// Dotfiles such as `.bashrc` and trailing dots have no extension.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext.to_string())
    }
}
