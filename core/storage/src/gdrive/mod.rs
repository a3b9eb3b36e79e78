//! Google Drive backup storage.
//!
//! - Bearer token per request, resolved through the token lifecycle
//! - Backup folder looked up once and cached
//! - Snapshots uploaded as single multipart requests

pub mod client;
pub mod repository;

pub use client::{DriveClient, DriveFile};
pub use repository::{snapshot_name, DriveBackupRepository, DriveConfig, SNAPSHOT_PREFIX};
