//! Authenticated vendor-client cache.
//!
//! Each provider gets one [`ClientCache`] holding at most one live
//! [`AuthenticatedHandle`]. Presenting the same credential again returns the
//! same handle; presenting a different one replaces it. The cache is a plain
//! value owned by whoever builds it (normally the
//! [`ClientRegistry`](crate::registry::ClientRegistry)), never global state.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use unidrive_common::{Credential, ProviderId, Result, StorageError};

/// A vendor client bound to one credential.
#[async_trait]
pub trait VendorClient: Send + Sync + 'static {
    /// Provider this client talks to.
    const PROVIDER: ProviderId;

    /// Resolve the account-scoped resource id (e.g. a drive id).
    ///
    /// Providers that need no such id keep the default.
    async fn resolve_account_resource(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Builds a vendor client for a credential.
pub type Connector<C> = Arc<dyn Fn(&Credential) -> Result<C> + Send + Sync>;

/// A live vendor client together with the credential it was built from.
pub struct AuthenticatedHandle<C> {
    provider: ProviderId,
    credential: Credential,
    client: C,
    account_resource: OnceCell<Option<String>>,
}

impl<C: VendorClient> AuthenticatedHandle<C> {
    pub fn new(credential: Credential, client: C) -> Self {
        Self {
            provider: C::PROVIDER,
            credential,
            client,
            account_resource: OnceCell::new(),
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The underlying vendor client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Account-scoped resource id, resolved on first use.
    ///
    /// A successful resolution is memoized for the lifetime of the handle.
    /// A failed one is not: the next call tries again.
    ///
    /// # Errors
    /// - `RootResolutionFailed` if the vendor lookup fails
    pub async fn account_resource(&self) -> Result<Option<&str>> {
        let resolved = self
            .account_resource
            .get_or_try_init(|| async {
                debug!(provider = %self.provider, "Resolving account resource");
                self.client
                    .resolve_account_resource()
                    .await
                    .map_err(|e| match e {
                        StorageError::RootResolutionFailed { .. } => e,
                        other => StorageError::RootResolutionFailed {
                            provider: self.provider,
                            detail: other.to_string(),
                        },
                    })
            })
            .await
            .inspect_err(|e| warn!(provider = %self.provider, "{}", e))?;

        Ok(resolved.as_deref())
    }

    /// Like [`account_resource`](Self::account_resource), but a provider
    /// that reports no id is also a resolution failure.
    pub async fn require_account_resource(&self) -> Result<&str> {
        self.account_resource()
            .await?
            .ok_or_else(|| StorageError::RootResolutionFailed {
                provider: self.provider,
                detail: "Vendor reported no account resource".to_string(),
            })
    }
}

/// Single-slot cache of authenticated handles for one provider.
pub struct ClientCache<C: VendorClient> {
    connector: Connector<C>,
    slot: Mutex<Option<Arc<AuthenticatedHandle<C>>>>,
}

impl<C: VendorClient> ClientCache<C> {
    /// Create an empty cache that builds clients with `connector`.
    pub fn new(connector: Connector<C>) -> Self {
        Self {
            connector,
            slot: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> ProviderId {
        C::PROVIDER
    }

    /// Get the handle for `credential`, building one if needed.
    ///
    /// # Postconditions
    /// - Same credential as the cached handle: the cached `Arc` is returned
    ///   and no client is constructed
    /// - Otherwise a new handle replaces the cached one
    ///
    /// # Errors
    /// - `Authentication` for an empty credential
    /// - Whatever the connector reports; the slot is left empty
    pub async fn acquire(&self, credential: &Credential) -> Result<Arc<AuthenticatedHandle<C>>> {
        if credential.is_empty() {
            return Err(StorageError::Authentication(format!(
                "Empty credential for {}",
                C::PROVIDER
            )));
        }

        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.as_ref() {
            if handle.credential() == credential {
                debug!(provider = %C::PROVIDER, "Reusing authenticated client");
                return Ok(Arc::clone(handle));
            }
        }

        // The previous credential is superseded whether or not the new one works.
        *slot = None;

        let client = (self.connector)(credential)?;
        let handle = Arc::new(AuthenticatedHandle::new(credential.clone(), client));
        info!(
            provider = %C::PROVIDER,
            credential = %credential.fingerprint(),
            "Built authenticated client"
        );

        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// The live handle, if any.
    pub async fn current(&self) -> Option<Arc<AuthenticatedHandle<C>>> {
        self.slot.lock().await.clone()
    }

    /// Drop the live handle.
    pub async fn invalidate(&self) {
        if self.slot.lock().await.take().is_some() {
            debug!(provider = %C::PROVIDER, "Invalidated authenticated client");
        }
    }
}
