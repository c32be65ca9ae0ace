//! Common error types for UniDrive.

use thiserror::Error;

use crate::types::ProviderId;

/// Error surfaced by every storage operation.
///
/// The set of variants is closed: adapters translate whatever their vendor
/// reports into one of these before it leaves the adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Credential missing, invalid, or rejected by the vendor.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The account-scoped resource id for a handle could not be resolved.
    #[error("Root resolution failed for {provider}: {detail}")]
    RootResolutionFailed { provider: ProviderId, detail: String },

    /// Vendor call failed for a reason opaque to the core.
    #[error(
        "API failure ({provider}{suffix}): {detail}",
        suffix = .status.map(|s| format!(", HTTP {s}")).unwrap_or_default()
    )]
    Api {
        provider: ProviderId,
        status: Option<u16>,
        detail: String,
    },

    /// Operation not supported by this provider adapter.
    #[error("{operation} is not implemented for {provider}")]
    NotImplemented {
        provider: ProviderId,
        operation: &'static str,
    },

    /// Invalid input provided by the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Status code of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    RootResolutionFailed,
    ApiFailure,
    NotImplemented,
    InvalidInput,
    Io,
}

impl StorageError {
    /// Build an API failure without an HTTP status.
    pub fn api(provider: ProviderId, detail: impl Into<String>) -> Self {
        Self::Api {
            provider,
            status: None,
            detail: detail.into(),
        }
    }

    /// Build an API failure carrying the vendor's HTTP status.
    pub fn api_status(provider: ProviderId, status: u16, detail: impl Into<String>) -> Self {
        Self::Api {
            provider,
            status: Some(status),
            detail: detail.into(),
        }
    }

    pub fn not_implemented(provider: ProviderId, operation: &'static str) -> Self {
        Self::NotImplemented {
            provider,
            operation,
        }
    }

    /// Get the status code of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::RootResolutionFailed { .. } => ErrorKind::RootResolutionFailed,
            Self::Api { .. } => ErrorKind::ApiFailure,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias using [`StorageError`].
pub type Result<T> = std::result::Result<T, StorageError>;
