//! Common types used throughout UniDrive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

use crate::error::StorageError;

/// Identifies one of the supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "gdrive")]
    GoogleDrive,
    #[serde(rename = "onedrive")]
    OneDrive,
    #[serde(rename = "dropbox")]
    Dropbox,
}

impl ProviderId {
    /// All providers, in selection order.
    pub const ALL: [ProviderId; 3] = [Self::GoogleDrive, Self::OneDrive, Self::Dropbox];

    /// Short machine name (e.g., "gdrive").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleDrive => "gdrive",
            Self::OneDrive => "onedrive",
            Self::Dropbox => "dropbox",
        }
    }

    /// Human-readable name of the provider's root folder.
    pub fn root_display_name(&self) -> &'static str {
        match self {
            Self::GoogleDrive => "My Drive",
            Self::OneDrive => "OneDrive",
            Self::Dropbox => "Dropbox",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gdrive" | "googledrive" | "google-drive" => Ok(Self::GoogleDrive),
            "onedrive" | "one-drive" => Ok(Self::OneDrive),
            "dropbox" => Ok(Self::Dropbox),
            other => Err(StorageError::InvalidInput(format!(
                "Unknown provider '{}'",
                other
            ))),
        }
    }
}

/// Access token presented by the authentication collaborator.
///
/// Treated as an opaque value: it is only compared for equality and sent
/// as a bearer token. The secret is wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct Credential(String);

impl Credential {
    /// Wrap an access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building authorization headers.
    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Short, stable digest of the token suitable for logs.
    pub fn fingerprint(&self) -> String {
        use blake2::digest::consts::U8;
        use blake2::{Blake2b, Digest};

        let mut hasher = Blake2b::<U8>::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED; {}])", self.fingerprint())
    }
}
