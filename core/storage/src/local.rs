//! Local file handles consumed by upload and update operations.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::io::ReaderStream;

use crate::provider::ByteStream;
use unidrive_common::{Result, StorageError};

/// A readable, named source of bytes.
///
/// The storage layer never assumes a particular medium: anything that can
/// report a name and a size and produce a byte stream can be uploaded.
#[async_trait]
pub trait LocalFile: Send + Sync {
    /// File name used as the remote name (no directory components).
    fn name(&self) -> &str;

    /// Explicit content type, if the caller knows it.
    fn mime_type(&self) -> Option<&str> {
        None
    }

    /// Total size in bytes.
    async fn size(&self) -> Result<u64>;

    /// Open the content as a stream of chunks.
    async fn open(&self) -> Result<ByteStream>;

    /// Read the whole content into memory.
    async fn read_all(&self) -> Result<Vec<u8>> {
        let stream = self.open().await?;
        collect_stream(stream).await
    }
}

/// Drain a byte stream into a single buffer.
pub async fn collect_stream(stream: ByteStream) -> Result<Vec<u8>> {
    stream
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
}

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsFile {
    path: PathBuf,
    name: String,
}

impl FsFile {
    /// Wrap a filesystem path.
    ///
    /// # Errors
    /// - Path has no file name component
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StorageError::InvalidInput(format!("Path has no file name: {}", path.display()))
            })?;

        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LocalFile for FsFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path).await?.len())
    }

    async fn open(&self) -> Result<ByteStream> {
        let file = fs::File::open(&self.path).await?;
        let stream = ReaderStream::new(file).map(|chunk| chunk.map_err(StorageError::from));
        Ok(Box::pin(stream))
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }
}

/// An in-memory file, handy for generated content and tests.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: Bytes,
    mime_type: Option<String>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[async_trait]
impl LocalFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    async fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    async fn open(&self) -> Result<ByteStream> {
        let data = self.data.clone();
        Ok(Box::pin(stream::once(async move { Ok(data) })))
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }
}
