//! Dropbox API v2 client.

use reqwest::{header, Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;

use unidrive_common::{Credential, ProviderId, Result, StorageError};

use crate::cache::VendorClient;
use crate::config::{DropboxEndpoints, StorageConfig};
use crate::http::transport_error;

/// Header carrying the arguments of a content endpoint call.
pub const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Serialize `arg` for the `Dropbox-API-Arg` header.
///
/// HTTP header values must be visible ASCII, so DEL and every non-ASCII
/// character is written as a JSON `\u` escape (surrogate pairs above the BMP).
pub fn header_json<T: Serialize + ?Sized>(arg: &T) -> Result<String> {
    let raw = serde_json::to_string(arg)
        .map_err(|e| StorageError::InvalidInput(format!("Failed to serialize API arg: {}", e)))?;

    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(escaped)
}

/// Dropbox client bound to one access token.
pub struct DropboxApi {
    http: Client,
    credential: Credential,
    api_base: String,
    content_base: String,
}

impl DropboxApi {
    pub fn new(http: Client, credential: Credential, endpoints: &DropboxEndpoints) -> Self {
        Self {
            http,
            credential,
            api_base: endpoints.api_base.trim_end_matches('/').to_string(),
            content_base: endpoints.content_base.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from the shared storage configuration.
    ///
    /// # Errors
    /// - HTTP client could not be created
    pub fn connect(credential: &Credential, config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(config.http_client()?, credential.clone(), &config.dropbox))
    }

    /// RPC endpoint call: JSON arguments in, JSON result out.
    pub(crate) fn rpc<T: Serialize + ?Sized>(&self, path: &str, arg: &T) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(self.credential.secret())
            .json(arg)
    }

    /// Content endpoint call: arguments in the `Dropbox-API-Arg` header.
    pub(crate) fn content<T: Serialize + ?Sized>(&self, path: &str, arg: &T) -> Result<RequestBuilder> {
        Ok(self
            .http
            .post(format!("{}{}", self.content_base, path))
            .bearer_auth(self.credential.secret())
            .header(API_ARG_HEADER, header_json(arg)?))
    }

    /// Content upload call with an octet-stream body.
    pub(crate) fn content_upload<T: Serialize + ?Sized>(
        &self,
        path: &str,
        arg: &T,
        data: Vec<u8>,
    ) -> Result<RequestBuilder> {
        Ok(self
            .content(path, arg)?
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(data))
    }

    pub(crate) async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let request = request
            .build()
            .map_err(|e| transport_error(Self::PROVIDER, context, e))?;
        debug!(url = %request.url(), "Dropbox request");

        self.http
            .execute(request)
            .await
            .map_err(|e| transport_error(Self::PROVIDER, context, e))
    }
}

impl VendorClient for DropboxApi {
    const PROVIDER: ProviderId = ProviderId::Dropbox;
}
