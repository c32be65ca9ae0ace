//! Dropbox provider.
//!
//! Folder ids are Dropbox paths (or `id:` references); the root sentinel is
//! the empty path. Sharing permissions and download conversion are not
//! offered and report `NotImplemented`.

pub mod client;
mod mapper;
pub mod service;

pub use client::DropboxApi;
pub use service::{DropboxService, Metadata};

use crate::adapter::ProviderAdapter;

/// Storage client for Dropbox.
pub type DropboxStorage = ProviderAdapter<DropboxService>;
