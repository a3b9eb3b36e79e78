//! Google Drive backup repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use liftsync_common::{AccessTokenSource, Error, Result, SnapshotPayload};

use crate::repository::{BackupRepository, SnapshotInfo};

use super::client::{DriveClient, DriveFile, DRIVE_API_BASE, DRIVE_UPLOAD_BASE, JSON_MIME_TYPE};

/// Prefix shared by every snapshot object name.
pub const SNAPSHOT_PREFIX: &str = "liftsync-backup-";

/// Google Drive backup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    pub upload_base: String,
    /// Name of the folder holding all snapshots.
    pub folder_name: String,
    /// Upper bound on snapshots returned by one listing.
    pub page_size: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
            folder_name: "LiftSync Backups".to_string(),
            page_size: 100,
        }
    }
}

/// Object name for a snapshot taken at `timestamp`.
pub fn snapshot_name(timestamp: DateTime<Utc>) -> String {
    format!(
        "{}{}.json",
        SNAPSHOT_PREFIX,
        timestamp.format("%Y-%m-%dT%H-%M-%S%.3fZ")
    )
}

/// Backup repository storing snapshots in one Drive folder.
pub struct DriveBackupRepository {
    config: DriveConfig,
    client: DriveClient,
    /// Cached id of the backup folder.
    folder_id: RwLock<Option<String>>,
}

impl DriveBackupRepository {
    pub fn new(config: DriveConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self> {
        let client = DriveClient::new(&config.api_base, &config.upload_base, tokens)?;
        Ok(Self {
            config,
            client,
            folder_id: RwLock::new(None),
        })
    }

    /// Look up the backup folder without creating it.
    async fn find_folder(&self) -> Result<Option<String>> {
        {
            let cached = self.folder_id.read().await;
            if let Some(id) = cached.as_ref() {
                return Ok(Some(id.clone()));
            }
        }

        let found = self.client.find_folder(&self.config.folder_name, None).await?;
        if let Some(folder) = &found {
            *self.folder_id.write().await = Some(folder.id.clone());
        }
        Ok(found.map(|f| f.id))
    }

    /// Find the backup folder, creating it if absent.
    ///
    /// Two callers racing here may both create a folder; the duplicate is
    /// harmless and listing only ever reads the first match.
    async fn ensure_folder(&self) -> Result<String> {
        if let Some(id) = self.find_folder().await? {
            return Ok(id);
        }

        let folder = self
            .client
            .create_folder(&self.config.folder_name, None)
            .await?;
        info!("Created backup folder '{}'", self.config.folder_name);
        *self.folder_id.write().await = Some(folder.id.clone());
        Ok(folder.id)
    }

    async fn invalidate_folder(&self) {
        *self.folder_id.write().await = None;
    }

    fn to_info(file: DriveFile) -> SnapshotInfo {
        SnapshotInfo {
            id: file.id,
            name: file.name,
            created_at: file.created_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

#[async_trait]
impl BackupRepository for DriveBackupRepository {
    fn name(&self) -> &str {
        "gdrive"
    }

    async fn create_snapshot(&self, payload: &SnapshotPayload) -> Result<String> {
        let name = snapshot_name(payload.timestamp);
        let body = serde_json::to_vec(payload)?;

        let folder_id = self.ensure_folder().await?;
        let uploaded = match self
            .client
            .upload_simple(&name, &folder_id, JSON_MIME_TYPE, body.clone())
            .await
        {
            Err(Error::NotFound(_)) => {
                // Folder removed behind our back.
                warn!("Backup folder vanished, recreating");
                self.invalidate_folder().await;
                let folder_id = self.ensure_folder().await?;
                self.client
                    .upload_simple(&name, &folder_id, JSON_MIME_TYPE, body)
                    .await?
            }
            other => other?,
        };

        info!("Uploaded snapshot {} ({})", uploaded.name, uploaded.id);
        Ok(uploaded.id)
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let Some(folder_id) = self.find_folder().await? else {
            debug!("No backup folder yet");
            return Ok(Vec::new());
        };

        let query = format!(
            "'{}' in parents and mimeType = '{}' and name contains '{}' and trashed = false",
            folder_id, JSON_MIME_TYPE, SNAPSHOT_PREFIX
        );
        let files = self
            .client
            .query_files(&query, Some("createdTime desc"), self.config.page_size)
            .await?;

        let mut snapshots: Vec<SnapshotInfo> = files.into_iter().map(Self::to_info).collect();
        SnapshotInfo::sort_newest_first(&mut snapshots);
        Ok(snapshots)
    }

    async fn fetch_snapshot(&self, id: &str) -> Result<serde_json::Value> {
        let bytes = self.client.download(id).await?;
        debug!("Fetched snapshot {} ({} bytes)", id, bytes.len());
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn delete_snapshot(&self, id: &str) -> Result<()> {
        self.client.delete(id).await?;
        debug!("Deleted snapshot {}", id);
        Ok(())
    }
}
