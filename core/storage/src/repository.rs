//! Backup repository trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use liftsync_common::{Result, SnapshotPayload};

/// Listing entry for one stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    /// Provider-specific object identifier.
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl SnapshotInfo {
    /// The snapshot with the latest `created_at`, regardless of input order.
    pub fn newest(snapshots: &[SnapshotInfo]) -> Option<&SnapshotInfo> {
        snapshots.iter().max_by_key(|s| s.created_at)
    }

    /// Sort newest first.
    pub fn sort_newest_first(snapshots: &mut [SnapshotInfo]) {
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

/// Remote object store holding backup snapshots.
///
/// All operations need a valid access credential; implementations obtain
/// it themselves.
///
/// # Errors
/// Every operation maps failures onto the shared taxonomy:
/// - `AuthExpired` when the remote rejected the credential (401)
/// - `AuthRequired` when no credential is available at all
/// - `NotFound` when the addressed snapshot does not exist
/// - `RemoteUnavailable` for any other transport or HTTP failure
#[async_trait]
pub trait BackupRepository: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Store `payload` as one object and return its remote id.
    ///
    /// Creates the backup folder first if it does not exist.
    async fn create_snapshot(&self, payload: &SnapshotPayload) -> Result<String>;

    /// List snapshots, newest first, bounded by the provider's page size.
    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>>;

    /// Fetch the raw body of a snapshot.
    ///
    /// The body is returned untyped so callers can unwrap older envelope
    /// formats.
    async fn fetch_snapshot(&self, id: &str) -> Result<serde_json::Value>;

    async fn delete_snapshot(&self, id: &str) -> Result<()>;
}
