//! File repository: raw service calls plus entity mapping.

use tracing::{debug, warn};

use unidrive_common::{Entity, Permission, ProviderId, Result, VersionRecord};

use crate::local::LocalFile;
use crate::mapper::{IntoEntity, IntoPermission, IntoVersion};
use crate::provider::ByteStream;
use crate::service::RawService;

/// Orchestrates a [`RawService`] and its record mappers.
///
/// Listing is lenient: a record that fails to map is dropped
/// and logged, and the remaining entries are returned in vendor order.
/// Errors from the service itself propagate unchanged.
pub struct FileRepository<S> {
    service: S,
}

impl<S: RawService> FileRepository<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn provider(&self) -> ProviderId {
        self.service.provider()
    }

    /// Mapped children of `parent_id`.
    pub async fn list_files(&self, parent_id: &str) -> Result<Vec<Entity>> {
        let records = self.service.list_children(parent_id).await?;
        Ok(map_all(self.provider(), "list_files", records, IntoEntity::into_entity))
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Entity>> {
        let records = self.service.search(query).await?;
        Ok(map_all(self.provider(), "search", records, IntoEntity::into_entity))
    }

    pub async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
    ) -> Result<Option<Entity>> {
        let record = self.service.create(name, mime_type, parent_id).await?;
        Ok(map_one(self.provider(), "create_file", record))
    }

    pub async fn delete_file(&self, id: &str) -> Result<bool> {
        self.service.delete(id).await
    }

    /// Upload and map the resulting record.
    ///
    /// # Returns
    /// - `None` when the service returned no record, or one that does not
    ///   map; the upload outcome is then unknown, which is not an error here
    pub async fn upload_file(&self, file: &dyn LocalFile, parent_id: &str) -> Result<Option<Entity>> {
        let record = self.service.upload_raw(file, parent_id).await?;
        Ok(map_one(self.provider(), "upload_file", record))
    }

    pub async fn download_file(&self, id: &str, mime_type: Option<&str>) -> Result<ByteStream> {
        self.service.download(id, mime_type).await
    }

    pub async fn update_file(&self, file: &dyn LocalFile, id: &str) -> Result<Option<Entity>> {
        let record = self.service.update(file, id).await?;
        Ok(map_one(self.provider(), "update_file", record))
    }

    pub async fn list_permissions(&self, id: &str) -> Result<Vec<Permission>> {
        let records = self.service.list_permissions(id).await?;
        Ok(map_all(
            self.provider(),
            "list_permissions",
            records,
            IntoPermission::into_permission,
        ))
    }

    pub async fn list_versions(&self, id: &str) -> Result<Vec<VersionRecord>> {
        let records = self.service.list_revisions(id).await?;
        Ok(map_all(
            self.provider(),
            "list_versions",
            records,
            IntoVersion::into_version,
        ))
    }
}

fn map_all<R, T>(
    provider: ProviderId,
    operation: &str,
    records: Vec<R>,
    map: impl Fn(R) -> Option<T>,
) -> Vec<T> {
    let total = records.len();
    let mapped: Vec<T> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let result = map(record);
            if result.is_none() {
                debug!(%provider, operation, index, "Skipping unmappable record");
            }
            result
        })
        .collect();

    let skipped = total - mapped.len();
    if skipped > 0 {
        warn!(
            %provider,
            operation,
            "Dropped {} of {} records that could not be mapped",
            skipped,
            total
        );
    }

    mapped
}

fn map_one<R: IntoEntity>(provider: ProviderId, operation: &str, record: Option<R>) -> Option<Entity> {
    match record {
        Some(record) => {
            let entity = record.into_entity();
            if entity.is_none() {
                warn!(%provider, operation, "Vendor returned a record that could not be mapped");
            }
            entity
        }
        None => {
            debug!(%provider, operation, "Vendor returned no record");
            None
        }
    }
}
