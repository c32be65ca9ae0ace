//! Raw Dropbox calls.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use unidrive_common::{ProviderId, Result, StorageError, ROOT_SENTINEL};

use super::client::DropboxApi;
use crate::cache::{AuthenticatedHandle, VendorClient};
use crate::http::{byte_stream, check, json, json_opt};
use crate::local::LocalFile;
use crate::mapper::{is_folder_mime, NoRecord, SizeField};
use crate::provider::ByteStream;
use crate::service::RawService;

const PROVIDER: ProviderId = DropboxApi::PROVIDER;

/// Largest file `files/upload` accepts in one request.
const UPLOAD_LIMIT: u64 = 150 * 1024 * 1024;
const SEARCH_PAGE_SIZE: u32 = 100;
const REVISION_LIMIT: u32 = 100;

/// File, folder or deleted-entry metadata.
///
/// Endpoints returning a single known kind omit `.tag`; the service fills
/// it in before handing the record on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(rename = ".tag")]
    pub tag: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub path_lower: Option<String>,
    pub path_display: Option<String>,
    pub size: Option<SizeField>,
    pub client_modified: Option<String>,
    pub server_modified: Option<String>,
    pub rev: Option<String>,
}

impl Metadata {
    fn tagged(mut self, tag: &str) -> Self {
        if self.tag.is_none() {
            self.tag = Some(tag.to_string());
        }
        self
    }
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    #[serde(default)]
    entries: Vec<Metadata>,
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct MetadataV2 {
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    metadata: Option<MetadataV2>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    matches: Vec<SearchMatch>,
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

/// Result of the `*_v2` endpoints that wrap one entry.
#[derive(Debug, Deserialize)]
struct MetadataResult {
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct RevisionsResult {
    #[serde(default)]
    entries: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_summary: String,
}

/// Dropbox path for an id, with the root sentinel as the empty path.
///
/// Ids (`id:...`) and absolute paths pass through unchanged.
pub fn to_path(id: &str) -> String {
    let id = id.trim();
    if id.is_empty() || id == ROOT_SENTINEL || id == "/" {
        String::new()
    } else if id.starts_with('/') || id.contains(':') {
        id.to_string()
    } else {
        format!("/{}", id)
    }
}

/// Path of `name` inside the folder addressed by `parent_id`.
fn child_path(parent_id: &str, name: &str) -> String {
    format!("{}/{}", to_path(parent_id).trim_end_matches('/'), name)
}

/// Read `file` for a single-request upload, rejecting it above [`UPLOAD_LIMIT`].
async fn read_within_limit(file: &dyn LocalFile) -> Result<Vec<u8>> {
    let size = file.size().await?;
    if size > UPLOAD_LIMIT {
        return Err(StorageError::InvalidInput(format!(
            "{} is {} bytes; Dropbox single-request uploads are limited to {} bytes",
            file.name(),
            size,
            UPLOAD_LIMIT
        )));
    }
    file.read_all().await
}

/// Continue a paginated endpoint while the vendor reports more results.
async fn follow<P, T>(
    api: &DropboxApi,
    first: P,
    continue_path: &str,
    context: &str,
    split: fn(P) -> (Vec<T>, Option<String>, bool),
) -> Result<Vec<T>>
where
    P: DeserializeOwned,
{
    let (mut items, mut cursor, mut has_more) = split(first);

    while has_more {
        let Some(current) = cursor.take().filter(|c| !c.is_empty()) else {
            break;
        };
        let request = api.rpc(continue_path, &serde_json::json!({ "cursor": current }));
        let response = api.send(request, context).await?;
        let (page, next, more) = split(json(PROVIDER, response).await?);
        items.extend(page);
        cursor = next;
        has_more = more;
    }

    Ok(items)
}

/// [`RawService`] over the Dropbox v2 API.
pub struct DropboxService {
    handle: Arc<AuthenticatedHandle<DropboxApi>>,
}

impl DropboxService {
    pub fn new(handle: Arc<AuthenticatedHandle<DropboxApi>>) -> Self {
        Self { handle }
    }

    fn api(&self) -> &DropboxApi {
        self.handle.client()
    }

    async fn upload_bytes(
        &self,
        path: &str,
        mode: &str,
        data: Vec<u8>,
        context: &str,
    ) -> Result<Option<Metadata>> {
        let arg = serde_json::json!({
            "path": path,
            "mode": mode,
            "autorename": mode == "add",
            "mute": false,
        });
        let request = self.api().content_upload("/files/upload", &arg, data)?;

        let response = self.api().send(request, context).await?;
        let record: Option<Metadata> = json_opt(PROVIDER, response).await?;
        Ok(record.map(|m| m.tagged("file")))
    }
}

#[async_trait]
impl RawService for DropboxService {
    type Record = Metadata;
    type Permission = NoRecord;
    type Revision = Metadata;

    fn provider(&self) -> ProviderId {
        PROVIDER
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<Metadata>> {
        let arg = serde_json::json!({ "path": to_path(parent_id), "recursive": false });
        let response = self
            .api()
            .send(self.api().rpc("/files/list_folder", &arg), "Failed to list folder")
            .await?;
        let first: ListFolderResult = json(PROVIDER, response).await?;

        follow(
            self.api(),
            first,
            "/files/list_folder/continue",
            "Failed to continue listing",
            |page: ListFolderResult| (page.entries, page.cursor, page.has_more),
        )
        .await
    }

    async fn search(&self, query: &str) -> Result<Vec<Metadata>> {
        let arg = serde_json::json!({
            "query": query,
            "options": { "path": "", "max_results": SEARCH_PAGE_SIZE },
        });
        let response = self
            .api()
            .send(self.api().rpc("/files/search_v2", &arg), "Failed to search")
            .await?;
        let first: SearchResult = json(PROVIDER, response).await?;

        follow(
            self.api(),
            first,
            "/files/search/continue_v2",
            "Failed to continue search",
            |page: SearchResult| {
                let entries = page
                    .matches
                    .into_iter()
                    .filter_map(|m| m.metadata.and_then(|m| m.metadata))
                    .collect();
                (entries, page.cursor, page.has_more)
            },
        )
        .await
    }

    async fn create(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
    ) -> Result<Option<Metadata>> {
        let path = child_path(parent_id, name);

        if !is_folder_mime(mime_type) {
            return self
                .upload_bytes(&path, "add", Vec::new(), "Failed to create file")
                .await;
        }

        let arg = serde_json::json!({ "path": path, "autorename": true });
        let response = self
            .api()
            .send(
                self.api().rpc("/files/create_folder_v2", &arg),
                "Failed to create folder",
            )
            .await?;
        let result: Option<MetadataResult> = json_opt(PROVIDER, response).await?;
        Ok(result
            .and_then(|r| r.metadata)
            .map(|m| m.tagged("folder")))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let arg = serde_json::json!({ "path": to_path(id) });
        let response = self
            .api()
            .send(self.api().rpc("/files/delete_v2", &arg), "Failed to delete")
            .await?;

        if response.status() == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            let summary = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error_summary)
                .unwrap_or_default();
            if summary.starts_with("path_lookup/not_found") {
                return Ok(false);
            }
            return Err(StorageError::api_status(
                PROVIDER,
                StatusCode::CONFLICT.as_u16(),
                body,
            ));
        }

        check(PROVIDER, response).await?;
        Ok(true)
    }

    async fn upload_raw(&self, file: &dyn LocalFile, parent_id: &str) -> Result<Option<Metadata>> {
        let data = read_within_limit(file).await?;
        self.upload_bytes(
            &child_path(parent_id, file.name()),
            "add",
            data,
            "Failed to upload file",
        )
        .await
    }

    async fn download(&self, id: &str, mime_type: Option<&str>) -> Result<ByteStream> {
        if mime_type.is_some() {
            return Err(StorageError::not_implemented(PROVIDER, "download_file"));
        }

        let arg = serde_json::json!({ "path": to_path(id) });
        let request = self.api().content("/files/download", &arg)?;
        let response = self.api().send(request, "Failed to start download").await?;
        byte_stream(PROVIDER, response).await
    }

    async fn update(&self, file: &dyn LocalFile, id: &str) -> Result<Option<Metadata>> {
        let data = read_within_limit(file).await?;
        self.upload_bytes(&to_path(id), "overwrite", data, "Failed to update file")
            .await
    }

    async fn list_revisions(&self, id: &str) -> Result<Vec<Metadata>> {
        let path = to_path(id);
        let mode = if path.starts_with("id:") { "id" } else { "path" };
        let arg = serde_json::json!({ "path": path, "mode": mode, "limit": REVISION_LIMIT });

        let response = self
            .api()
            .send(
                self.api().rpc("/files/list_revisions", &arg),
                "Failed to list revisions",
            )
            .await?;
        let result: RevisionsResult = json(PROVIDER, response).await?;
        Ok(result.entries)
    }
}
