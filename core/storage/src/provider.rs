//! Storage client trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use unidrive_common::{Entity, Permission, ProviderId, Result, VersionRecord};

use crate::local::LocalFile;

/// Byte stream type for upload/download operations.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Uniform file-storage contract implemented by every provider adapter.
///
/// Callers never see vendor types: every method speaks in canonical
/// entities and [`unidrive_common::StorageError`]. Ids are provider ids as
/// returned in [`Entity::id`]; [`unidrive_common::ROOT_SENTINEL`] addresses
/// the account root on every provider.
///
/// [`Entity::parent_id`] is always accepted as a folder id by the client
/// that produced it, but it need not equal the parent's [`Entity::id`].
/// Dropbox reports parents by lower-cased path (`/homework/math`) while
/// its entries carry `id:` ids; Google Drive and OneDrive use item ids
/// for both.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Which backend serves this client.
    fn provider(&self) -> ProviderId;

    /// The account root folder. Constant per provider.
    fn root_folder(&self) -> Entity;

    /// List the direct children of a folder.
    ///
    /// # Postconditions
    /// - Entries are in the order the vendor reported them
    /// - Entries the adapter cannot map are left out rather than failing
    ///   the whole listing
    ///
    /// # Errors
    /// - Authentication, root resolution, or API failures
    async fn list_files(&self, parent_id: &str) -> Result<Vec<Entity>>;

    /// Search the account for entries whose name matches `query`.
    async fn search(&self, query: &str) -> Result<Vec<Entity>>;

    /// Create an empty file, or a folder when `mime_type` is a folder type.
    ///
    /// Returns `None` when the vendor accepted the request but reported
    /// nothing usable back.
    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
    ) -> Result<Option<Entity>>;

    /// Delete an entry.
    ///
    /// # Returns
    /// - `true` if the entry was deleted
    /// - `false` if the vendor reports it does not exist
    async fn delete_file(&self, id: &str) -> Result<bool>;

    /// Upload a local file into `parent_id` (the root when `None`).
    ///
    /// # Returns
    /// - `Some(entity)` for the uploaded file
    /// - `None` when the upload outcome is unknown
    async fn upload_file(
        &self,
        file: &dyn LocalFile,
        parent_id: Option<&str>,
    ) -> Result<Option<Entity>>;

    /// Download file content, optionally converted to `mime_type`.
    async fn download_file(&self, file_id: &str, mime_type: Option<&str>) -> Result<ByteStream>;

    /// Replace the content of an existing file.
    async fn update_file(&self, file: &dyn LocalFile, file_id: &str) -> Result<Option<Entity>>;

    /// Access grants on a file.
    async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>>;

    /// Prior revisions of a file.
    async fn list_versions(&self, file_id: &str) -> Result<Vec<VersionRecord>>;
}
