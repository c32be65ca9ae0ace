//! Response handling shared by the vendor clients.

use bytes::Bytes;
use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use unidrive_common::{ProviderId, Result, StorageError};

use crate::provider::ByteStream;

/// Characters escaped in a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode an id or name for use as one path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Map a transport failure (DNS, TLS, connection reset, timeout).
pub(crate) fn transport_error(provider: ProviderId, context: &str, e: reqwest::Error) -> StorageError {
    StorageError::api(provider, format!("{}: {}", context, e))
}

/// Turn a non-success response into an error.
///
/// 401 is an authentication failure; every other status is passed through
/// as an API failure with the response body as detail.
pub(crate) async fn check(provider: ProviderId, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(StorageError::Authentication(format!(
            "{} rejected the access token: {}",
            provider, body
        )));
    }

    Err(StorageError::api_status(provider, status.as_u16(), body))
}

/// Check the response and decode its JSON body.
pub(crate) async fn json<T: DeserializeOwned>(provider: ProviderId, response: Response) -> Result<T> {
    let response = check(provider, response).await?;
    response
        .json()
        .await
        .map_err(|e| StorageError::api(provider, format!("Failed to parse response: {}", e)))
}

/// Like [`json`], but an empty body yields `None`.
pub(crate) async fn json_opt<T: DeserializeOwned>(
    provider: ProviderId,
    response: Response,
) -> Result<Option<T>> {
    let response = check(provider, response).await?;
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(provider, "Failed to read response", e))?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| StorageError::api(provider, format!("Failed to parse response: {}", e)))
}

/// Check the response and expose its body as a [`ByteStream`].
pub(crate) async fn byte_stream(provider: ProviderId, response: Response) -> Result<ByteStream> {
    let response = check(provider, response).await?;
    let stream = response
        .bytes_stream()
        .map(move |chunk| chunk.map_err(|e| transport_error(provider, "Stream read error", e)));
    Ok(Box::pin(stream))
}

/// Re-chunks a byte stream into fixed-size pieces for resumable uploads.
pub(crate) struct ChunkReader {
    stream: ByteStream,
    buffer: Vec<u8>,
    chunk_size: usize,
    done: bool,
}

impl ChunkReader {
    pub(crate) fn new(stream: ByteStream, chunk_size: usize) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
            done: false,
        }
    }

    /// Next chunk of exactly `chunk_size` bytes; the last one may be shorter.
    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        while !self.done && self.buffer.len() < self.chunk_size {
            match self.stream.next().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk?),
                None => self.done = true,
            }
        }

        if self.buffer.is_empty() {
            return Ok(None);
        }

        let take = self.buffer.len().min(self.chunk_size);
        let chunk: Vec<u8> = self.buffer.drain(..take).collect();
        Ok(Some(Bytes::from(chunk)))
    }
}
