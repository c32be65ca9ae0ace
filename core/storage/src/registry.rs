//! Provider registry: client caches plus the storage-client factory.

use std::sync::Arc;

use unidrive_common::{Credential, ProviderId, Result, StorageError};

use crate::cache::{AuthenticatedHandle, ClientCache, Connector};
use crate::config::StorageConfig;
use crate::dropbox::{DropboxApi, DropboxService, DropboxStorage};
use crate::gdrive::{DriveApi, DriveService, GDriveStorage};
use crate::onedrive::{GraphApi, GraphService, OneDriveStorage};
use crate::provider::StorageClient;

/// An authenticated handle for one of the supported providers.
#[derive(Clone)]
pub enum AuthenticatedClient {
    GoogleDrive(Arc<AuthenticatedHandle<DriveApi>>),
    OneDrive(Arc<AuthenticatedHandle<GraphApi>>),
    Dropbox(Arc<AuthenticatedHandle<DropboxApi>>),
}

impl AuthenticatedClient {
    pub fn provider(&self) -> ProviderId {
        match self {
            Self::GoogleDrive(h) => h.provider(),
            Self::OneDrive(h) => h.provider(),
            Self::Dropbox(h) => h.provider(),
        }
    }
}

/// Build the storage client for `provider` on top of `client`.
///
/// # Errors
/// - `InvalidInput` if `client` belongs to a different provider
pub fn build(provider: ProviderId, client: AuthenticatedClient) -> Result<Arc<dyn StorageClient>> {
    match (provider, client) {
        (ProviderId::GoogleDrive, AuthenticatedClient::GoogleDrive(handle)) => {
            Ok(Arc::new(GDriveStorage::new(DriveService::new(handle))))
        }
        (ProviderId::OneDrive, AuthenticatedClient::OneDrive(handle)) => {
            Ok(Arc::new(OneDriveStorage::new(GraphService::new(handle))))
        }
        (ProviderId::Dropbox, AuthenticatedClient::Dropbox(handle)) => {
            Ok(Arc::new(DropboxStorage::new(DropboxService::new(handle))))
        }
        (provider, client) => Err(StorageError::InvalidInput(format!(
            "Cannot build a {} client from a {} handle",
            provider,
            client.provider()
        ))),
    }
}

/// Per-provider client caches.
///
/// One live authenticated client per provider at a time. The registry is an
/// ordinary value: create one and pass it to whatever needs storage access.
pub struct ClientRegistry {
    gdrive: ClientCache<DriveApi>,
    onedrive: ClientCache<GraphApi>,
    dropbox: ClientCache<DropboxApi>,
}

impl ClientRegistry {
    /// Registry whose clients are built from `config`.
    pub fn new(config: StorageConfig) -> Self {
        let config = Arc::new(config);

        let gdrive_config = Arc::clone(&config);
        let onedrive_config = Arc::clone(&config);
        let dropbox_config = config;

        Self::with_connectors(
            Arc::new(move |cred: &Credential| DriveApi::connect(cred, &gdrive_config)),
            Arc::new(move |cred: &Credential| GraphApi::connect(cred, &onedrive_config)),
            Arc::new(move |cred: &Credential| DropboxApi::connect(cred, &dropbox_config)),
        )
    }

    /// Registry with explicit connectors.
    pub fn with_connectors(
        gdrive: Connector<DriveApi>,
        onedrive: Connector<GraphApi>,
        dropbox: Connector<DropboxApi>,
    ) -> Self {
        Self {
            gdrive: ClientCache::new(gdrive),
            onedrive: ClientCache::new(onedrive),
            dropbox: ClientCache::new(dropbox),
        }
    }

    /// Authenticated handle for `provider`, reusing the cached one when the
    /// credential matches.
    ///
    /// # Errors
    /// - `Authentication` for an empty credential
    /// - Client construction failures
    pub async fn acquire(
        &self,
        provider: ProviderId,
        credential: &Credential,
    ) -> Result<AuthenticatedClient> {
        Ok(match provider {
            ProviderId::GoogleDrive => {
                AuthenticatedClient::GoogleDrive(self.gdrive.acquire(credential).await?)
            }
            ProviderId::OneDrive => {
                AuthenticatedClient::OneDrive(self.onedrive.acquire(credential).await?)
            }
            ProviderId::Dropbox => {
                AuthenticatedClient::Dropbox(self.dropbox.acquire(credential).await?)
            }
        })
    }

    /// Acquire a handle and build the storage client on it.
    pub async fn connect(
        &self,
        provider: ProviderId,
        credential: &Credential,
    ) -> Result<Arc<dyn StorageClient>> {
        let client = self.acquire(provider, credential).await?;
        build(provider, client)
    }

    /// Drop the cached client for `provider`.
    pub async fn invalidate(&self, provider: ProviderId) {
        match provider {
            ProviderId::GoogleDrive => self.gdrive.invalidate().await,
            ProviderId::OneDrive => self.onedrive.invalidate().await,
            ProviderId::Dropbox => self.dropbox.invalidate().await,
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(StorageConfig::default())
    }
}
