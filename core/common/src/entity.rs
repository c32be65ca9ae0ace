//! Canonical, provider-neutral entity model.
//!
//! Every adapter maps its vendor records into these types. Fields are
//! private: entities are assembled once by a mapper and only read after
//! that.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Id substituted for a missing parent reference.
///
/// Also accepted by every adapter as the id of the account root.
pub const ROOT_SENTINEL: &str = "root";

fn resolve_parent(parent: Option<&str>) -> String {
    match parent.map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => ROOT_SENTINEL.to_string(),
    }
}

/// A folder as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderEntry {
    id: String,
    name: String,
    created_at: Option<DateTime<Utc>>,
    modified_at: Option<DateTime<Utc>>,
    parent_id: String,
}

impl FolderEntry {
    /// Create a folder entry.
    ///
    /// An absent or blank `parent` resolves to [`ROOT_SENTINEL`].
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: None,
            modified_at: None,
            parent_id: resolve_parent(parent),
        }
    }

    pub fn with_times(
        mut self,
        created_at: Option<DateTime<Utc>>,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.modified_at = modified_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }
}

/// A file as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    id: String,
    name: String,
    created_at: Option<DateTime<Utc>>,
    modified_at: Option<DateTime<Utc>>,
    parent_id: String,
    mime_type: String,
    size_bytes: Option<u64>,
    extension: Option<String>,
}

impl FileEntry {
    /// Create a file entry with an empty mime type and no size.
    ///
    /// An absent or blank `parent` resolves to [`ROOT_SENTINEL`].
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: None,
            modified_at: None,
            parent_id: resolve_parent(parent),
            mime_type: String::new(),
            size_bytes: None,
            extension: None,
        }
    }

    pub fn with_times(
        mut self,
        created_at: Option<DateTime<Utc>>,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.modified_at = modified_at;
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_size(mut self, size_bytes: Option<u64>) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension.filter(|e| !e.is_empty());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// Mime type; empty when neither the vendor nor the extension told us.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes, when the backend reports it.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

/// A file or folder returned by a storage client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Folder(FolderEntry),
    File(FileEntry),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Self::Folder(f) => f.id(),
            Self::File(f) => f.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => f.name(),
            Self::File(f) => f.name(),
        }
    }

    /// Folder reference usable as a `parent_id` with the same provider.
    ///
    /// Not necessarily equal to the parent's [`Entity::id`]: Dropbox
    /// parents are lower-cased paths.
    pub fn parent_id(&self) -> &str {
        match self {
            Self::Folder(f) => f.parent_id(),
            Self::File(f) => f.parent_id(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Folder(f) => f.created_at(),
            Self::File(f) => f.created_at(),
        }
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Folder(f) => f.modified_at(),
            Self::File(f) => f.modified_at(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Self::File(f) => Some(f),
            Self::Folder(_) => None,
        }
    }
}

impl From<FolderEntry> for Entity {
    fn from(folder: FolderEntry) -> Self {
        Self::Folder(folder)
    }
}

impl From<FileEntry> for Entity {
    fn from(file: FileEntry) -> Self {
        Self::File(file)
    }
}

/// An access grant on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    id: String,
    role: String,
    scope: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl Permission {
    /// Create a permission.
    ///
    /// `role` is the granted capability (e.g. "reader", "write") and `scope`
    /// who it applies to (e.g. "user", "anyone", "link").
    pub fn new(id: impl Into<String>, role: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            scope: scope.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

/// A prior revision of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    id: String,
    modified_at: Option<DateTime<Utc>>,
    author: Option<String>,
    size_bytes: Option<u64>,
}

impl VersionRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            modified_at: None,
            author: None,
            size_bytes: None,
        }
    }

    pub fn with_modified_at(mut self, modified_at: Option<DateTime<Utc>>) -> Self {
        self.modified_at = modified_at;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_size(mut self, size_bytes: Option<u64>) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }
}
