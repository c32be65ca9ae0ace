//! Microsoft Graph client for OneDrive.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use unidrive_common::{Credential, ProviderId, Result, StorageError};

use crate::cache::VendorClient;
use crate::config::{OneDriveEndpoints, StorageConfig};
use crate::http::{json, transport_error};

/// Response from `GET /me/drive`.
#[derive(Debug, Deserialize)]
struct DriveResponse {
    id: Option<String>,
}

/// Graph v1.0 client bound to one access token.
pub struct GraphApi {
    http: Client,
    credential: Credential,
    api_base: String,
}

impl GraphApi {
    pub fn new(http: Client, credential: Credential, endpoints: &OneDriveEndpoints) -> Self {
        Self {
            http,
            credential,
            api_base: endpoints.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from the shared storage configuration.
    ///
    /// # Errors
    /// - HTTP client could not be created
    pub fn connect(credential: &Credential, config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(config.http_client()?, credential.clone(), &config.onedrive))
    }

    /// Request relative to the Graph base URL.
    pub(crate) fn api(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(self.credential.secret())
    }

    /// Request to an absolute Graph URL, such as an `@odata.nextLink`.
    pub(crate) fn absolute(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.credential.secret())
    }

    /// Request to a pre-authenticated upload session URL.
    ///
    /// Session URLs carry their own authorization and reject a bearer token.
    pub(crate) fn session(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url)
    }

    pub(crate) async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let request = request
            .build()
            .map_err(|e| transport_error(Self::PROVIDER, context, e))?;
        debug!(method = %request.method(), url = %request.url(), "Graph request");

        self.http
            .execute(request)
            .await
            .map_err(|e| transport_error(Self::PROVIDER, context, e))
    }
}

#[async_trait]
impl VendorClient for GraphApi {
    const PROVIDER: ProviderId = ProviderId::OneDrive;

    /// The id of the signed-in user's default drive.
    async fn resolve_account_resource(&self) -> Result<Option<String>> {
        let response = self
            .send(self.api(Method::GET, "/me/drive"), "Failed to get drive")
            .await?;
        let drive: DriveResponse = json(Self::PROVIDER, response).await?;

        drive
            .id
            .filter(|id| !id.is_empty())
            .map(Some)
            .ok_or_else(|| StorageError::RootResolutionFailed {
                provider: Self::PROVIDER,
                detail: "Drive response carried no id".to_string(),
            })
    }
}
