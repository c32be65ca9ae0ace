//! Google Drive provider.
//!
//! Talks to the Drive v3 API. Supports every storage operation, including
//! export downloads of Google Workspace documents and resumable uploads for
//! files above 5 MiB.

pub mod client;
mod mapper;
pub mod service;

pub use client::DriveApi;
pub use service::{DriveFile, DrivePermission, DriveRevision, DriveService};

use crate::adapter::ProviderAdapter;

/// Storage client for Google Drive.
pub type GDriveStorage = ProviderAdapter<DriveService>;
