//! Raw OneDrive calls through Microsoft Graph.

use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use unidrive_common::{ProviderId, Result, StorageError, ROOT_SENTINEL};

use super::client::GraphApi;
use crate::cache::{AuthenticatedHandle, VendorClient};
use crate::http::{byte_stream, check, encode_segment, json, json_opt, ChunkReader};
use crate::local::LocalFile;
use crate::mapper::{is_folder_mime, SizeField};
use crate::provider::ByteStream;
use crate::service::RawService;

const PROVIDER: ProviderId = GraphApi::PROVIDER;

/// Largest file sent as a single `PUT .../content`.
const SIMPLE_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;
/// Upload session chunk size; Graph requires a multiple of 320 KiB.
const CHUNK_SIZE: usize = 32 * 320 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    pub id: Option<String>,
    /// Path of the parent, e.g. `/drive/root:` or `/drive/root:/Documents`.
    pub path: Option<String>,
    pub drive_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    pub mime_type: Option<String>,
}

/// A Graph `driveItem`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub size: Option<SizeField>,
    pub created_date_time: Option<String>,
    pub last_modified_date_time: Option<String>,
    pub parent_reference: Option<ParentReference>,
    pub file: Option<FileFacet>,
    pub folder: Option<serde_json::Value>,
    /// Present only on the drive's root item.
    pub root: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphIdentity {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentitySet {
    pub user: Option<GraphIdentity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharingLink {
    /// `anonymous`, `organization` or `users`.
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPermission {
    pub id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub link: Option<SharingLink>,
    pub granted_to_v2: Option<IdentitySet>,
    pub granted_to: Option<IdentitySet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItemVersion {
    pub id: Option<String>,
    pub last_modified_date_time: Option<String>,
    pub size: Option<SizeField>,
    pub last_modified_by: Option<IdentitySet>,
}

/// One page of a Graph collection.
#[derive(Debug, Deserialize)]
struct GraphPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSession {
    upload_url: String,
}

enum ChunkOutcome {
    Accepted,
    Complete(Option<DriveItem>),
}

/// Graph `format` value for a requested download mime type.
fn conversion_format(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "application/pdf" => Some("pdf"),
        "text/html" => Some("html"),
        _ => None,
    }
}

/// Graph path addressing an item, with the root sentinel mapped to the drive root.
fn item_path(drive_id: &str, id: &str) -> String {
    if id == ROOT_SENTINEL {
        format!("/drives/{}/root", encode_segment(drive_id))
    } else {
        format!(
            "/drives/{}/items/{}",
            encode_segment(drive_id),
            encode_segment(id)
        )
    }
}

/// Graph path addressing `name` inside a parent folder, followed by `suffix`.
fn child_path(drive_id: &str, parent_id: &str, name: &str, suffix: &str) -> String {
    format!(
        "{}:/{}:/{}",
        item_path(drive_id, parent_id),
        encode_segment(name),
        suffix
    )
}

fn lacks_parent_path(item: &DriveItem) -> bool {
    item.parent_reference
        .as_ref()
        .is_some_and(|p| p.id.is_some() && p.path.is_none())
}

/// Replace a parent reference to the root item with the root sentinel.
fn point_root_parent_at_sentinel(item: &mut DriveItem, root_id: &str) {
    if let Some(parent) = item.parent_reference.as_mut() {
        if parent.id.as_deref() == Some(root_id) {
            parent.id = Some(ROOT_SENTINEL.to_string());
        }
    }
}

/// [`RawService`] over Microsoft Graph v1.0.
pub struct GraphService {
    handle: Arc<AuthenticatedHandle<GraphApi>>,
    root_item_id: OnceCell<String>,
}

impl GraphService {
    pub fn new(handle: Arc<AuthenticatedHandle<GraphApi>>) -> Self {
        Self {
            handle,
            root_item_id: OnceCell::new(),
        }
    }

    fn api(&self) -> &GraphApi {
        self.handle.client()
    }

    /// Drive id for this account; every item path is scoped by it.
    async fn drive_id(&self) -> Result<&str> {
        self.handle.require_account_resource().await
    }

    /// Item id of the drive root, fetched on first use.
    async fn root_item_id(&self, drive_id: &str) -> Result<&str> {
        self.root_item_id
            .get_or_try_init(|| async {
                let request = self
                    .api()
                    .api(Method::GET, &item_path(drive_id, ROOT_SENTINEL))
                    .query(&[("$select", "id")]);
                let response = self.api().send(request, "Failed to fetch root item").await?;
                let root: DriveItem = json(PROVIDER, response).await?;
                root.id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| StorageError::api(PROVIDER, "Root item has no id"))
            })
            .await
            .map(String::as_str)
    }

    /// GET a collection and follow `@odata.nextLink` to the end.
    async fn collect_pages<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut request = self.api().api(Method::GET, path);

        loop {
            let response = self.api().send(request, context).await?;
            let page: GraphPage<T> = json(PROVIDER, response).await?;
            items.extend(page.value);

            match page.next_link.filter(|l| !l.is_empty()) {
                Some(link) => {
                    let link = Url::parse(&link).map_err(|e| {
                        StorageError::api(PROVIDER, format!("Invalid nextLink {}: {}", link, e))
                    })?;
                    request = self.api().absolute(Method::GET, link);
                }
                None => break,
            }
        }

        Ok(items)
    }

    async fn put_content(
        &self,
        path: &str,
        mime_type: &str,
        data: Vec<u8>,
        context: &str,
    ) -> Result<Option<DriveItem>> {
        let request = self
            .api()
            .api(Method::PUT, path)
            .header(header::CONTENT_TYPE, mime_type)
            .body(data);

        let response = self.api().send(request, context).await?;
        json_opt(PROVIDER, response).await
    }

    /// Open an upload session at `path` and return its upload URL.
    async fn create_upload_session(&self, path: &str, conflict_behavior: &str) -> Result<String> {
        let body = serde_json::json!({
            "item": { "@microsoft.graph.conflictBehavior": conflict_behavior }
        });
        let request = self.api().api(Method::POST, path).json(&body);

        let response = self
            .api()
            .send(request, "Failed to create upload session")
            .await?;
        let session: UploadSession = json(PROVIDER, response).await?;
        Ok(session.upload_url)
    }

    async fn upload_chunk(
        &self,
        upload_url: &str,
        data: bytes::Bytes,
        offset: u64,
        total: u64,
    ) -> Result<ChunkOutcome> {
        let range_end = offset + data.len() as u64 - 1;
        let content_range = format!("bytes {}-{}/{}", offset, range_end, total);

        let request = self
            .api()
            .session(Method::PUT, upload_url)
            .header(header::CONTENT_RANGE, content_range)
            .body(data);

        let response = self.api().send(request, "Failed to upload chunk").await?;
        if response.status() == StatusCode::ACCEPTED {
            return Ok(ChunkOutcome::Accepted);
        }

        Ok(ChunkOutcome::Complete(json_opt(PROVIDER, response).await?))
    }

    async fn upload_session(
        &self,
        upload_url: &str,
        file: &dyn LocalFile,
        total: u64,
    ) -> Result<Option<DriveItem>> {
        let mut reader = ChunkReader::new(file.open().await?, CHUNK_SIZE);
        let mut offset = 0u64;

        while let Some(chunk) = reader.next_chunk().await? {
            let len = chunk.len() as u64;
            match self.upload_chunk(upload_url, chunk, offset, total).await? {
                ChunkOutcome::Complete(item) => return Ok(item),
                ChunkOutcome::Accepted => offset += len,
            }
            debug!(offset, total, "Chunk accepted");
        }

        Err(StorageError::api(
            PROVIDER,
            format!("Upload session ended after {} of {} bytes", offset, total),
        ))
    }
}

#[async_trait]
impl RawService for GraphService {
    type Record = DriveItem;
    type Permission = GraphPermission;
    type Revision = DriveItemVersion;

    fn provider(&self) -> ProviderId {
        PROVIDER
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<DriveItem>> {
        let drive_id = self.drive_id().await?;
        let path = format!("{}/children", item_path(drive_id, parent_id));
        self.collect_pages(&path, "Failed to list children").await
    }

    async fn search(&self, query: &str) -> Result<Vec<DriveItem>> {
        let drive_id = self.drive_id().await?;
        let escaped = query.replace('\'', "''");
        let path = format!(
            "{}/search(q='{}')",
            item_path(drive_id, ROOT_SENTINEL),
            encode_segment(&escaped)
        );
        let mut items: Vec<DriveItem> = self.collect_pages(&path, "Failed to search").await?;

        // Search results carry the parent id without the parent path.
        if items.iter().any(lacks_parent_path) {
            let root_id = self.root_item_id(drive_id).await?;
            for item in &mut items {
                point_root_parent_at_sentinel(item, root_id);
            }
        }
        Ok(items)
    }

    async fn create(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
    ) -> Result<Option<DriveItem>> {
        let drive_id = self.drive_id().await?;

        if is_folder_mime(mime_type) {
            let body = serde_json::json!({
                "name": name,
                "folder": {},
                "@microsoft.graph.conflictBehavior": "rename",
            });
            let request = self
                .api()
                .api(
                    Method::POST,
                    &format!("{}/children", item_path(drive_id, parent_id)),
                )
                .json(&body);

            let response = self.api().send(request, "Failed to create folder").await?;
            return json_opt(PROVIDER, response).await;
        }

        self.put_content(
            &child_path(drive_id, parent_id, name, "content"),
            mime_type,
            Vec::new(),
            "Failed to create file",
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let drive_id = self.drive_id().await?;
        let response = self
            .api()
            .send(
                self.api().api(Method::DELETE, &item_path(drive_id, id)),
                "Failed to delete item",
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(PROVIDER, response).await?;
        Ok(true)
    }

    async fn upload_raw(&self, file: &dyn LocalFile, parent_id: &str) -> Result<Option<DriveItem>> {
        let drive_id = self.drive_id().await?;
        let total = file.size().await?;

        if total <= SIMPLE_UPLOAD_LIMIT {
            let mime_type = file.mime_type().unwrap_or("application/octet-stream");
            let data = file.read_all().await?;
            self.put_content(
                &child_path(drive_id, parent_id, file.name(), "content"),
                mime_type,
                data,
                "Failed to upload file",
            )
            .await
        } else {
            debug!(name = file.name(), total, "Using upload session");
            let upload_url = self
                .create_upload_session(
                    &child_path(drive_id, parent_id, file.name(), "createUploadSession"),
                    "rename",
                )
                .await?;
            self.upload_session(&upload_url, file, total).await
        }
    }

    async fn download(&self, id: &str, mime_type: Option<&str>) -> Result<ByteStream> {
        let drive_id = self.drive_id().await?;
        let mut request = self
            .api()
            .api(Method::GET, &format!("{}/content", item_path(drive_id, id)));

        if let Some(mime_type) = mime_type {
            let format = conversion_format(mime_type).ok_or_else(|| {
                StorageError::InvalidInput(format!(
                    "OneDrive cannot convert downloads to {}",
                    mime_type
                ))
            })?;
            request = request.query(&[("format", format)]);
        }

        let response = self.api().send(request, "Failed to start download").await?;
        byte_stream(PROVIDER, response).await
    }

    async fn update(&self, file: &dyn LocalFile, id: &str) -> Result<Option<DriveItem>> {
        let drive_id = self.drive_id().await?;
        let total = file.size().await?;

        if total > SIMPLE_UPLOAD_LIMIT {
            debug!(id, total, "Using upload session for update");
            let upload_url = self
                .create_upload_session(
                    &format!("{}/createUploadSession", item_path(drive_id, id)),
                    "replace",
                )
                .await?;
            return self.upload_session(&upload_url, file, total).await;
        }

        let mime_type = file.mime_type().unwrap_or("application/octet-stream");
        let data = file.read_all().await?;
        self.put_content(
            &format!("{}/content", item_path(drive_id, id)),
            mime_type,
            data,
            "Failed to update file",
        )
        .await
    }

    async fn list_permissions(&self, id: &str) -> Result<Vec<GraphPermission>> {
        let drive_id = self.drive_id().await?;
        let path = format!("{}/permissions", item_path(drive_id, id));
        self.collect_pages(&path, "Failed to list permissions").await
    }

    async fn list_revisions(&self, id: &str) -> Result<Vec<DriveItemVersion>> {
        let drive_id = self.drive_id().await?;
        let path = format!("{}/versions", item_path(drive_id, id));
        self.collect_pages(&path, "Failed to list versions").await
    }
}
