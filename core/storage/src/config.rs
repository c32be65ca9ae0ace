//! Storage configuration.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use unidrive_common::{Result, StorageError};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
/// Microsoft Graph API base URL.
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
/// Dropbox RPC endpoint base URL.
const DROPBOX_API_BASE: &str = "https://api.dropboxapi.com/2";
/// Dropbox content endpoint base URL.
const DROPBOX_CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// Google Drive endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GDriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
}

impl Default for GDriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }
}

/// OneDrive (Microsoft Graph) endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneDriveEndpoints {
    pub api_base: String,
}

impl Default for OneDriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: GRAPH_API_BASE.to_string(),
        }
    }
}

/// Dropbox endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropboxEndpoints {
    pub api_base: String,
    pub content_base: String,
}

impl Default for DropboxEndpoints {
    fn default() -> Self {
        Self {
            api_base: DROPBOX_API_BASE.to_string(),
            content_base: DROPBOX_CONTENT_BASE.to_string(),
        }
    }
}

/// Configuration shared by all vendor clients.
///
/// Every field has a default, so an empty JSON object is a valid
/// configuration. Tests override the endpoints to point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub gdrive: GDriveEndpoints,
    pub onedrive: OneDriveEndpoints,
    pub dropbox: DropboxEndpoints,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout applied by the HTTP client. No timeout when unset.
    pub request_timeout_secs: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            gdrive: GDriveEndpoints::default(),
            onedrive: OneDriveEndpoints::default(),
            dropbox: DropboxEndpoints::default(),
            user_agent: concat!("UniDrive/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: None,
        }
    }
}

impl StorageConfig {
    /// Parse a configuration from a JSON value.
    ///
    /// # Errors
    /// - Value does not match the configuration shape
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| StorageError::InvalidInput(format!("Invalid storage config: {}", e)))
    }

    /// Load a configuration file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not a valid configuration
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read(path.as_ref()).await?;
        serde_json::from_slice(&raw).map_err(|e| {
            StorageError::InvalidInput(format!(
                "Invalid storage config {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Point every provider at one base URL (for mock servers).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.gdrive.api_base = base.to_string();
        self.gdrive.upload_base = format!("{}/upload", base);
        self.onedrive.api_base = base.to_string();
        self.dropbox.api_base = base.to_string();
        self.dropbox.content_base = format!("{}/content", base);
        self
    }

    /// Build the HTTP client vendor clients share.
    ///
    /// # Errors
    /// - TLS backend could not be initialised
    pub fn http_client(&self) -> Result<Client> {
        let mut builder = Client::builder().user_agent(self.user_agent.clone());
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder
            .build()
            .map_err(|e| StorageError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
    }
}
