//! Raw Google Drive calls.

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use unidrive_common::{ProviderId, Result, StorageError};

use super::client::DriveApi;
use crate::cache::{AuthenticatedHandle, VendorClient};
use crate::http::{byte_stream, check, encode_segment, json, json_opt, ChunkReader};
use crate::local::LocalFile;
use crate::mapper::{is_folder_mime, SizeField};
use crate::provider::ByteStream;
use crate::service::RawService;

const PROVIDER: ProviderId = DriveApi::PROVIDER;

/// Drive's own folder mime type.
pub const DRIVE_FOLDER_MIME: &str = "application/vnd.google-apps.folder";

const FILE_FIELDS: &str =
    "id,name,mimeType,size,createdTime,modifiedTime,parents,fileExtension,trashed";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,size,createdTime,modifiedTime,parents,fileExtension,trashed)";
const PERMISSION_FIELDS: &str = "nextPageToken,permissions(id,type,role,emailAddress,displayName)";
const REVISION_FIELDS: &str =
    "nextPageToken,revisions(id,modifiedTime,size,lastModifyingUser(displayName,emailAddress))";

/// Files up to this size go through a single multipart request.
const MULTIPART_LIMIT: u64 = 5 * 1024 * 1024;
/// Resumable chunk size; Drive requires a multiple of 256 KiB.
const CHUNK_SIZE: usize = 256 * 1024;

/// File metadata as Drive returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    /// Drive reports sizes as decimal strings.
    pub size: Option<SizeField>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    pub file_extension: Option<String>,
    #[serde(default)]
    pub trashed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrivePermission {
    pub id: Option<String>,
    /// `user`, `group`, `domain` or `anyone`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub role: Option<String>,
    pub email_address: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUser {
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveRevision {
    pub id: Option<String>,
    pub modified_time: Option<String>,
    pub size: Option<SizeField>,
    pub last_modifying_user: Option<DriveUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<DrivePermission>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevisionList {
    #[serde(default)]
    revisions: Vec<DriveRevision>,
    next_page_token: Option<String>,
}

enum ChunkOutcome {
    Incomplete,
    Complete(Option<DriveFile>),
}

/// Quote a value for a Drive `q` expression.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// [`RawService`] over the Drive v3 API.
pub struct DriveService {
    handle: Arc<AuthenticatedHandle<DriveApi>>,
}

impl DriveService {
    pub fn new(handle: Arc<AuthenticatedHandle<DriveApi>>) -> Self {
        Self { handle }
    }

    fn api(&self) -> &DriveApi {
        self.handle.client()
    }

    /// GET a paginated collection, following `nextPageToken` to the end.
    async fn collect_pages<P, T>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        context: &str,
        split: fn(P) -> (Vec<T>, Option<String>),
    ) -> Result<Vec<T>>
    where
        P: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.api().api(Method::GET, path).query(params);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self.api().send(request, context).await?;
            let (page, next) = split(json(PROVIDER, response).await?);
            items.extend(page);

            match next.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(items)
    }

    async fn query_files(&self, q: &str, context: &str) -> Result<Vec<DriveFile>> {
        self.collect_pages(
            "/files",
            &[("q", q), ("fields", LIST_FIELDS), ("pageSize", "1000")],
            context,
            |page: FileList| (page.files, page.next_page_token),
        )
        .await
    }

    async fn upload_multipart(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<Option<DriveFile>> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id],
        });
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| StorageError::InvalidInput(format!("Failed to serialize metadata: {}", e)))?;

        let boundary = format!("unidrive-{}", uuid::Uuid::new_v4().simple());
        let mut body = Vec::with_capacity(data.len() + metadata_json.len() + 256);

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata_json.as_bytes());
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}--", boundary).as_bytes());

        let request = self
            .api()
            .upload(Method::POST, "/files")
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let response = self.api().send(request, "Failed to upload file").await?;
        json_opt(PROVIDER, response).await
    }

    /// Open a resumable session and return its upload URI.
    ///
    /// `request` carries the method, target and metadata body: a POST to
    /// `/files` for new files, a PATCH to `/files/{id}` for new content.
    async fn start_resumable_upload(
        &self,
        request: RequestBuilder,
        mime_type: &str,
        total_size: u64,
    ) -> Result<String> {
        let request = request
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", total_size.to_string());

        let response = self
            .api()
            .send(request, "Failed to start resumable upload")
            .await?;
        let response = check(PROVIDER, response).await?;

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StorageError::api(PROVIDER, "No upload URI in resumable upload response"))
    }

    async fn upload_chunk(
        &self,
        upload_uri: &str,
        data: bytes::Bytes,
        start_byte: u64,
        total_size: u64,
    ) -> Result<ChunkOutcome> {
        let end_byte = start_byte + data.len() as u64 - 1;
        let content_range = format!("bytes {}-{}/{}", start_byte, end_byte, total_size);

        let request = self
            .api()
            .session(Method::PUT, upload_uri)
            .header(header::CONTENT_RANGE, content_range)
            .body(data);

        let response = self.api().send(request, "Failed to upload chunk").await?;
        if response.status() == StatusCode::PERMANENT_REDIRECT {
            return Ok(ChunkOutcome::Incomplete);
        }

        Ok(ChunkOutcome::Complete(json_opt(PROVIDER, response).await?))
    }

    async fn upload_resumable(
        &self,
        upload_uri: &str,
        file: &dyn LocalFile,
        total_size: u64,
    ) -> Result<Option<DriveFile>> {
        let mut reader = ChunkReader::new(file.open().await?, CHUNK_SIZE);
        let mut bytes_uploaded = 0u64;

        while let Some(chunk) = reader.next_chunk().await? {
            let len = chunk.len() as u64;
            match self
                .upload_chunk(upload_uri, chunk, bytes_uploaded, total_size)
                .await?
            {
                ChunkOutcome::Complete(record) => return Ok(record),
                ChunkOutcome::Incomplete => bytes_uploaded += len,
            }
            debug!(bytes_uploaded, total_size, "Uploaded chunk");
        }

        Err(StorageError::api(
            PROVIDER,
            format!(
                "Upload did not complete after {} of {} bytes",
                bytes_uploaded, total_size
            ),
        ))
    }
}

#[async_trait]
impl RawService for DriveService {
    type Record = DriveFile;
    type Permission = DrivePermission;
    type Revision = DriveRevision;

    fn provider(&self) -> ProviderId {
        PROVIDER
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<DriveFile>> {
        let q = format!("{} in parents and trashed = false", quote(parent_id));
        self.query_files(&q, "Failed to list folder").await
    }

    async fn search(&self, query: &str) -> Result<Vec<DriveFile>> {
        let q = format!("name contains {} and trashed = false", quote(query));
        self.query_files(&q, "Failed to search").await
    }

    async fn create(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
    ) -> Result<Option<DriveFile>> {
        let mime_type = if is_folder_mime(mime_type) {
            DRIVE_FOLDER_MIME
        } else {
            mime_type
        };

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": mime_type,
            "parents": [parent_id],
        });

        let request = self
            .api()
            .api(Method::POST, "/files")
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata);

        let response = self.api().send(request, "Failed to create file").await?;
        json_opt(PROVIDER, response).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let path = format!("/files/{}", encode_segment(id));
        let response = self
            .api()
            .send(self.api().api(Method::DELETE, &path), "Failed to delete file")
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(PROVIDER, response).await?;
        Ok(true)
    }

    async fn upload_raw(&self, file: &dyn LocalFile, parent_id: &str) -> Result<Option<DriveFile>> {
        let total_size = file.size().await?;
        let mime_type = file
            .mime_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if total_size <= MULTIPART_LIMIT {
            let data = file.read_all().await?;
            self.upload_multipart(file.name(), parent_id, &mime_type, data)
                .await
        } else {
            debug!(name = file.name(), total_size, "Using resumable upload");
            let metadata = serde_json::json!({
                "name": file.name(),
                "parents": [parent_id],
            });
            let request = self
                .api()
                .upload(Method::POST, "/files")
                .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
                .json(&metadata);

            let upload_uri = self
                .start_resumable_upload(request, &mime_type, total_size)
                .await?;
            self.upload_resumable(&upload_uri, file, total_size).await
        }
    }

    async fn download(&self, id: &str, mime_type: Option<&str>) -> Result<ByteStream> {
        let request = match mime_type {
            Some(export_type) => self
                .api()
                .api(Method::GET, &format!("/files/{}/export", encode_segment(id)))
                .query(&[("mimeType", export_type)]),
            None => self
                .api()
                .api(Method::GET, &format!("/files/{}", encode_segment(id)))
                .query(&[("alt", "media")]),
        };

        let response = self.api().send(request, "Failed to start download").await?;
        byte_stream(PROVIDER, response).await
    }

    async fn update(&self, file: &dyn LocalFile, id: &str) -> Result<Option<DriveFile>> {
        let total_size = file.size().await?;
        let mime_type = file.mime_type().unwrap_or("application/octet-stream");
        let path = format!("/files/{}", encode_segment(id));

        if total_size > MULTIPART_LIMIT {
            debug!(id, total_size, "Using resumable update");
            let request = self
                .api()
                .upload(Method::PATCH, &path)
                .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
                .json(&serde_json::json!({}));

            let upload_uri = self
                .start_resumable_upload(request, mime_type, total_size)
                .await?;
            return self.upload_resumable(&upload_uri, file, total_size).await;
        }

        let data = file.read_all().await?;
        let request = self
            .api()
            .upload(Method::PATCH, &path)
            .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
            .header(header::CONTENT_TYPE, mime_type)
            .body(data);

        let response = self.api().send(request, "Failed to update file").await?;
        json_opt(PROVIDER, response).await
    }

    async fn list_permissions(&self, id: &str) -> Result<Vec<DrivePermission>> {
        self.collect_pages(
            &format!("/files/{}/permissions", encode_segment(id)),
            &[("fields", PERMISSION_FIELDS)],
            "Failed to list permissions",
            |page: PermissionList| (page.permissions, page.next_page_token),
        )
        .await
    }

    async fn list_revisions(&self, id: &str) -> Result<Vec<DriveRevision>> {
        self.collect_pages(
            &format!("/files/{}/revisions", encode_segment(id)),
            &[("fields", REVISION_FIELDS)],
            "Failed to list revisions",
            |page: RevisionList| (page.revisions, page.next_page_token),
        )
        .await
    }
}
