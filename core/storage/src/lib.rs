//! Uniform cloud-storage access for UniDrive.
//!
//! Google Drive, OneDrive and Dropbox are exposed through one
//! [`StorageClient`] contract speaking canonical entities. Each provider is
//! layered the same way:
//!
//! - a vendor client ([`gdrive::DriveApi`], [`onedrive::GraphApi`],
//!   [`dropbox::DropboxApi`]) bound to one credential and cached by a
//!   [`ClientCache`]
//! - a [`RawService`] returning vendor-native records
//! - mappers turning records into entities, applied leniently by the
//!   [`FileRepository`]
//! - the shared [`ProviderAdapter`] implementing [`StorageClient`]
//!
//! [`ClientRegistry`] ties these together: give it a provider and a
//! credential and it hands back a ready storage client.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod dropbox;
pub mod gdrive;
mod http;
pub mod local;
pub mod mapper;
pub mod onedrive;
pub mod provider;
pub mod registry;
pub mod repository;
pub mod service;
pub mod session;

pub use adapter::ProviderAdapter;
pub use cache::{AuthenticatedHandle, ClientCache, Connector, VendorClient};
pub use config::StorageConfig;
pub use dropbox::DropboxStorage;
pub use gdrive::GDriveStorage;
pub use local::{collect_stream, FsFile, LocalFile, MemoryFile};
pub use mapper::FOLDER_MIME_TYPE;
pub use onedrive::OneDriveStorage;
pub use provider::{ByteStream, StorageClient};
pub use registry::{build, AuthenticatedClient, ClientRegistry};
pub use repository::FileRepository;
pub use service::RawService;
pub use session::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
