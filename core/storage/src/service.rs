//! Raw, per-provider service calls.
//!
//! A [`RawService`] is a thin pass-through to a vendor API: it returns the
//! vendor's own record shapes, performs no mapping and filters nothing.
//! Capabilities a provider does not offer keep the default methods, which
//! report `NotImplemented` instead of an empty result.

use async_trait::async_trait;

use unidrive_common::{ProviderId, Result, StorageError};

use crate::local::LocalFile;
use crate::mapper::{IntoEntity, IntoPermission, IntoVersion};
use crate::provider::ByteStream;

#[async_trait]
pub trait RawService: Send + Sync + 'static {
    /// Native file/folder record.
    type Record: IntoEntity + Send;
    /// Native permission record.
    type Permission: IntoPermission + Send;
    /// Native revision record.
    type Revision: IntoVersion + Send;

    fn provider(&self) -> ProviderId;

    /// Children of a folder, in vendor order, across all pages.
    async fn list_children(&self, parent_id: &str) -> Result<Vec<Self::Record>>;

    /// Upload a new file into `parent_id`.
    ///
    /// `None` when the vendor accepted the upload but returned no record.
    async fn upload_raw(
        &self,
        file: &dyn LocalFile,
        parent_id: &str,
    ) -> Result<Option<Self::Record>>;

    async fn search(&self, _query: &str) -> Result<Vec<Self::Record>> {
        Err(StorageError::not_implemented(self.provider(), "search"))
    }

    async fn create(
        &self,
        _name: &str,
        _mime_type: &str,
        _parent_id: &str,
    ) -> Result<Option<Self::Record>> {
        Err(StorageError::not_implemented(self.provider(), "create_file"))
    }

    /// `false` when the vendor reports the entry does not exist.
    async fn delete(&self, _id: &str) -> Result<bool> {
        Err(StorageError::not_implemented(self.provider(), "delete_file"))
    }

    async fn download(&self, _id: &str, _mime_type: Option<&str>) -> Result<ByteStream> {
        Err(StorageError::not_implemented(self.provider(), "download_file"))
    }

    async fn update(&self, _file: &dyn LocalFile, _id: &str) -> Result<Option<Self::Record>> {
        Err(StorageError::not_implemented(self.provider(), "update_file"))
    }

    async fn list_permissions(&self, _id: &str) -> Result<Vec<Self::Permission>> {
        Err(StorageError::not_implemented(self.provider(), "list_permissions"))
    }

    async fn list_revisions(&self, _id: &str) -> Result<Vec<Self::Revision>> {
        Err(StorageError::not_implemented(self.provider(), "list_versions"))
    }
}
