//! OneDrive provider over Microsoft Graph.
//!
//! Every item path is scoped by the account's drive id, which is looked up
//! once per authenticated client on first use.

pub mod client;
mod mapper;
pub mod service;

pub use client::GraphApi;
pub use service::{DriveItem, DriveItemVersion, GraphPermission, GraphService};

use crate::adapter::ProviderAdapter;

/// Storage client for OneDrive.
pub type OneDriveStorage = ProviderAdapter<GraphService>;
