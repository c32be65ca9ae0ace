//! Storage client built on a provider's repository.

use async_trait::async_trait;

use unidrive_common::{
    Entity, FolderEntry, Permission, ProviderId, Result, VersionRecord, ROOT_SENTINEL,
};

use crate::local::LocalFile;
use crate::provider::{ByteStream, StorageClient};
use crate::repository::FileRepository;
use crate::service::RawService;

/// [`StorageClient`] implementation shared by all providers.
///
/// What a provider supports is decided by its [`RawService`]; this type
/// only routes calls and fills in the root folder.
pub struct ProviderAdapter<S> {
    repository: FileRepository<S>,
}

impl<S: RawService> ProviderAdapter<S> {
    pub fn new(service: S) -> Self {
        Self {
            repository: FileRepository::new(service),
        }
    }

    pub fn repository(&self) -> &FileRepository<S> {
        &self.repository
    }
}

#[async_trait]
impl<S: RawService> StorageClient for ProviderAdapter<S> {
    fn provider(&self) -> ProviderId {
        self.repository.provider()
    }

    fn root_folder(&self) -> Entity {
        let provider = self.provider();
        FolderEntry::new(ROOT_SENTINEL, provider.root_display_name(), None).into()
    }

    async fn list_files(&self, parent_id: &str) -> Result<Vec<Entity>> {
        self.repository.list_files(parent_id).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Entity>> {
        self.repository.search(query).await
    }

    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
    ) -> Result<Option<Entity>> {
        self.repository.create_file(name, mime_type, parent_id).await
    }

    async fn delete_file(&self, id: &str) -> Result<bool> {
        self.repository.delete_file(id).await
    }

    async fn upload_file(
        &self,
        file: &dyn LocalFile,
        parent_id: Option<&str>,
    ) -> Result<Option<Entity>> {
        let parent_id = parent_id.unwrap_or(ROOT_SENTINEL);
        self.repository.upload_file(file, parent_id).await
    }

    async fn download_file(&self, file_id: &str, mime_type: Option<&str>) -> Result<ByteStream> {
        self.repository.download_file(file_id, mime_type).await
    }

    async fn update_file(&self, file: &dyn LocalFile, file_id: &str) -> Result<Option<Entity>> {
        self.repository.update_file(file, file_id).await
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>> {
        self.repository.list_permissions(file_id).await
    }

    async fn list_versions(&self, file_id: &str) -> Result<Vec<VersionRecord>> {
        self.repository.list_versions(file_id).await
    }
}
