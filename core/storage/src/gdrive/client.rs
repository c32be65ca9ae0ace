//! Google Drive API client.

use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use unidrive_common::{Credential, ProviderId, Result};

use crate::cache::VendorClient;
use crate::config::{GDriveEndpoints, StorageConfig};
use crate::http::transport_error;

/// Google Drive v3 client bound to one access token.
pub struct DriveApi {
    http: Client,
    credential: Credential,
    api_base: String,
    upload_base: String,
}

impl DriveApi {
    pub fn new(http: Client, credential: Credential, endpoints: &GDriveEndpoints) -> Self {
        Self {
            http,
            credential,
            api_base: endpoints.api_base.trim_end_matches('/').to_string(),
            upload_base: endpoints.upload_base.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from the shared storage configuration.
    ///
    /// # Errors
    /// - HTTP client could not be created
    pub fn connect(credential: &Credential, config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(config.http_client()?, credential.clone(), &config.gdrive))
    }

    /// Request against the metadata API.
    pub(crate) fn api(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(self.credential.secret())
    }

    /// Request against the upload API.
    pub(crate) fn upload(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.upload_base, path))
            .bearer_auth(self.credential.secret())
    }

    /// Request against a resumable session URI returned by the upload API.
    pub(crate) fn session(&self, method: Method, uri: &str) -> RequestBuilder {
        self.http.request(method, uri).bearer_auth(self.credential.secret())
    }

    pub(crate) async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let request = request
            .build()
            .map_err(|e| transport_error(Self::PROVIDER, context, e))?;
        debug!(method = %request.method(), url = %request.url(), "Drive request");

        self.http
            .execute(request)
            .await
            .map_err(|e| transport_error(Self::PROVIDER, context, e))
    }
}

impl VendorClient for DriveApi {
    const PROVIDER: ProviderId = ProviderId::GoogleDrive;
}
