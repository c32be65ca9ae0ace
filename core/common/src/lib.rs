//! Common utilities and types shared across UniDrive modules.
//!
//! This crate holds the provider-neutral vocabulary of the workspace: the
//! canonical file/folder model every adapter maps into, the permission and
//! version value objects, provider identifiers, credentials, and the closed
//! error taxonomy surfaced to callers.

pub mod entity;
pub mod error;
pub mod types;

pub use entity::{Entity, FileEntry, FolderEntry, Permission, VersionRecord, ROOT_SENTINEL};
pub use error::{ErrorKind, Result, StorageError};
pub use types::{Credential, ProviderId};
