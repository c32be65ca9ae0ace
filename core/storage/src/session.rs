//! Session preferences: which provider the user last selected.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use unidrive_common::{ProviderId, Result, StorageError};

/// Provider selected when nothing has been stored yet.
pub const DEFAULT_PROVIDER: ProviderId = ProviderId::GoogleDrive;

/// Persisted preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub selected_provider: ProviderId,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_provider: DEFAULT_PROVIDER,
        }
    }
}

/// Storage for session preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Prepare the store for use. Safe to call more than once.
    async fn initialise(&self) -> Result<()>;

    /// The selected provider, or [`DEFAULT_PROVIDER`] if none was stored.
    async fn selected_provider(&self) -> Result<ProviderId>;

    async fn set_selected_provider(&self, provider: ProviderId) -> Result<()>;
}

/// Preferences kept in a JSON file.
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/unidrive/preferences.json`.
    ///
    /// # Errors
    /// - The platform has no config directory
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            StorageError::InvalidInput("No config directory on this platform".to_string())
        })?;
        Ok(Self::new(dir.join("unidrive").join("preferences.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Preferences> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No preferences file, using defaults");
                return Ok(Preferences::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| {
            StorageError::InvalidInput(format!(
                "Invalid preferences file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_vec_pretty(preferences)
            .map_err(|e| StorageError::InvalidInput(format!("Failed to serialize preferences: {}", e)))?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn initialise(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            // Surface a corrupt file now rather than on first read.
            self.load().await?;
            return Ok(());
        }

        self.save(&Preferences::default()).await?;
        info!(path = %self.path.display(), "Created preferences file");
        Ok(())
    }

    async fn selected_provider(&self) -> Result<ProviderId> {
        Ok(self.load().await?.selected_provider)
    }

    async fn set_selected_provider(&self, provider: ProviderId) -> Result<()> {
        let mut preferences = self.load().await?;
        preferences.selected_provider = provider;
        self.save(&preferences).await?;
        debug!(%provider, "Saved selected provider");
        Ok(())
    }
}

/// In-memory preferences.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    preferences: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn initialise(&self) -> Result<()> {
        Ok(())
    }

    async fn selected_provider(&self) -> Result<ProviderId> {
        Ok(self.preferences.lock().await.selected_provider)
    }

    async fn set_selected_provider(&self, provider: ProviderId) -> Result<()> {
        self.preferences.lock().await.selected_provider = provider;
        Ok(())
    }
}
