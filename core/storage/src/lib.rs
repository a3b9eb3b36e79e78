//! Remote backup storage for LiftSync.
//!
//! Snapshots are stored as single JSON objects inside one logical folder of
//! a cloud file store. The [`BackupRepository`] trait hides the provider;
//! [`DriveBackupRepository`] talks to the Google Drive v3 API and
//! [`MemoryBackupRepository`] keeps everything in process.

pub mod gdrive;
pub mod memory;
pub mod repository;

pub use gdrive::{DriveBackupRepository, DriveClient, DriveConfig};
pub use memory::{FailureMode, MemoryBackupRepository};
pub use repository::{BackupRepository, SnapshotInfo};
