//! Sync coordinator: throttling, upload, rotation and restore.

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use liftsync_common::{
    Error, Result, SnapshotData, SnapshotPayload, SyncMetadata, SyncOutcome, TriggerReason,
};
use liftsync_storage::{BackupRepository, SnapshotInfo};
use liftsync_store::{ImportSummary, LocalStore};

use crate::notifier::SyncNotifier;

/// Configuration for the sync coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of snapshots kept remotely.
    pub retention_cap: usize,
    /// Window in which a repeated login does not reconcile again.
    pub login_guard_secs: u64,
    /// Period of the background sync timer.
    pub periodic_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retention_cap: 20,
            login_guard_secs: 30,
            periodic_interval_secs: 24 * 60 * 60,
        }
    }
}

impl SyncConfig {
    pub fn login_guard(&self) -> Duration {
        Duration::from_secs(self.login_guard_secs)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs(self.periodic_interval_secs)
    }

    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.periodic_interval_secs == 0 {
            return Err(Error::InvalidInput(
                "periodic_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.retention_cap == 0 {
            return Err(Error::InvalidInput(
                "retention_cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub trigger: TriggerReason,
    pub remote_id: String,
    pub entity_count: usize,
    /// Old snapshots removed by rotation.
    pub rotated: usize,
}

/// Outcome of a completed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub remote_id: String,
    pub imported: ImportSummary,
}

/// Decides whether and when to sync, and runs uploads and restores.
///
/// Restore is whole-snapshot overwrite: the last backup wins over local
/// state, with no per-entity merge.
///
/// Concurrent background syncs are not serialized against each other. Two
/// triggers may both pass the throttle before either records success; the
/// extra snapshot is pruned by rotation.
pub struct SyncCoordinator {
    store: Arc<LocalStore>,
    backups: Arc<dyn BackupRepository>,
    notifier: Arc<dyn SyncNotifier>,
    config: SyncConfig,
    /// Set once the user has been told their sign-in expired.
    auth_prompted: AtomicBool,
    authenticated: AtomicBool,
    last_reconcile: Mutex<Option<Instant>>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<LocalStore>,
        backups: Arc<dyn BackupRepository>,
        notifier: Arc<dyn SyncNotifier>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            backups,
            notifier,
            config,
            auth_prompted: AtomicBool::new(false),
            authenticated: AtomicBool::new(false),
            last_reconcile: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn backups(&self) -> &Arc<dyn BackupRepository> {
        &self.backups
    }

    /// Current sync bookkeeping.
    pub fn status(&self) -> Result<SyncMetadata> {
        self.store.sync_metadata()
    }

    /// Request a throttled sync without waiting for it.
    ///
    /// The sync runs as a detached task; its outcome is visible only through
    /// [`SyncMetadata`]. Failures are logged, except that an expired sign-in
    /// is reported once through the notifier. The returned handle carries no
    /// result and may be dropped.
    pub fn maybe_sync(self: &Arc<Self>, trigger: TriggerReason) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run_trigger(trigger).await })
    }

    /// Throttled sync for `trigger`, swallowing errors.
    pub(crate) async fn run_trigger(&self, trigger: TriggerReason) {
        match self.sync_if_due(trigger).await {
            Ok(Some(report)) => {
                debug!("Background sync ({}) stored {}", trigger, report.remote_id)
            }
            Ok(None) => {}
            Err(Error::AuthRequired) => {
                debug!("Background sync ({}) skipped: not signed in", trigger);
            }
            Err(Error::AuthExpired(message)) => {
                warn!("Background sync ({}) rejected: {}", trigger, message);
                if !self.auth_prompted.swap(true, Ordering::SeqCst) {
                    self.notifier.auth_expired(&message);
                }
            }
            Err(e) => warn!("Background sync ({}) failed: {}", trigger, e),
        }
    }

    /// Sync for `trigger` if its minimum interval has elapsed.
    ///
    /// Returns `Ok(None)` when throttled.
    pub async fn sync_if_due(&self, trigger: TriggerReason) -> Result<Option<SyncReport>> {
        let metadata = self.store.sync_metadata()?;
        let now = Utc::now();

        if !metadata.is_due(trigger, now) {
            debug!(
                "Sync for {} throttled ({} min since last sync, needs {})",
                trigger,
                metadata.minutes_since_sync(now).unwrap_or_default(),
                trigger.policy().min_interval_minutes
            );
            return Ok(None);
        }

        self.upload(trigger).await.map(Some)
    }

    /// Sync now, ignoring the throttle, and surface any error.
    pub async fn manual_sync(&self) -> Result<SyncReport> {
        self.upload(TriggerReason::Manual).await
    }

    async fn upload(&self, trigger: TriggerReason) -> Result<SyncReport> {
        self.record_outcome(SyncOutcome::Pending)?;

        match self.upload_snapshot(trigger).await {
            Ok(report) => {
                self.auth_prompted.store(false, Ordering::SeqCst);
                info!(
                    "Sync ({}) uploaded {} entities as {}, rotated {}",
                    trigger, report.entity_count, report.remote_id, report.rotated
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(record_err) = self.record_outcome(SyncOutcome::Failed) {
                    error!("Failed to record sync failure: {}", record_err);
                }
                Err(e)
            }
        }
    }

    async fn upload_snapshot(&self, trigger: TriggerReason) -> Result<SyncReport> {
        let data = self.store.export_all()?;
        let entity_count = data.entity_count();
        let payload = SnapshotPayload::new(trigger, data);

        let remote_id = self.backups.create_snapshot(&payload).await?;

        self.store.put_sync_metadata(&SyncMetadata {
            last_sync_time: Some(Utc::now()),
            last_sync_status: Some(SyncOutcome::Success),
            last_remote_id: Some(remote_id.clone()),
        })?;

        let rotated = self.rotate().await;

        Ok(SyncReport {
            trigger,
            remote_id,
            entity_count,
            rotated,
        })
    }

    /// Delete snapshots beyond the retention cap, oldest first.
    ///
    /// Best-effort: failures are logged per snapshot and never fail the
    /// sync. Returns the number deleted.
    async fn rotate(&self) -> usize {
        let mut snapshots = match self.backups.list_snapshots().await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!("Skipping backup rotation, listing failed: {}", e);
                return 0;
            }
        };

        if snapshots.len() <= self.config.retention_cap {
            return 0;
        }

        SnapshotInfo::sort_newest_first(&mut snapshots);
        let excess = snapshots.split_off(self.config.retention_cap);
        debug!("Rotating {} old snapshots", excess.len());

        let results = join_all(
            excess
                .iter()
                .map(|snapshot| self.backups.delete_snapshot(&snapshot.id)),
        )
        .await;

        let mut deleted = 0;
        for (snapshot, result) in excess.iter().zip(results) {
            match result {
                Ok(()) => deleted += 1,
                Err(e) => warn!("Failed to delete old snapshot {}: {}", snapshot.id, e),
            }
        }
        deleted
    }

    /// Replace all local data with a snapshot.
    ///
    /// Without an id the newest snapshot is used. This is destructive: local
    /// entities absent from the snapshot are gone afterwards.
    ///
    /// # Errors
    /// - `RestoreDataMissing` if no id is given and no snapshot exists
    /// - `NotFound` if the given snapshot does not exist
    pub async fn restore(&self, remote_id: Option<&str>) -> Result<RestoreReport> {
        let target = match remote_id {
            Some(id) => id.to_string(),
            None => {
                let snapshots = self.backups.list_snapshots().await?;
                SnapshotInfo::newest(&snapshots)
                    .ok_or(Error::RestoreDataMissing)?
                    .id
                    .clone()
            }
        };

        self.restore_snapshot(target).await
    }

    async fn restore_snapshot(&self, remote_id: String) -> Result<RestoreReport> {
        info!("Restoring from snapshot {}", remote_id);
        let body = self.backups.fetch_snapshot(&remote_id).await?;
        let data = SnapshotData::from_payload_value(body)?;

        self.store.clear_all()?;
        let imported = self.store.import_all(&data)?;

        self.store.put_sync_metadata(&SyncMetadata {
            last_sync_time: Some(Utc::now()),
            last_sync_status: Some(SyncOutcome::Success),
            last_remote_id: Some(remote_id.clone()),
        })?;

        info!(
            "Restored {} exercises, {} templates, {} workouts",
            imported.exercises, imported.templates, imported.workouts
        );
        Ok(RestoreReport {
            remote_id,
            imported,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Track sign-in state and reconcile on a fresh login.
    ///
    /// On an unauthenticated to authenticated transition the newest remote
    /// snapshot, if any, is restored. A repeat within the login guard window
    /// is ignored.
    pub async fn handle_auth_change(&self, authenticated: bool) -> Result<Option<RestoreReport>> {
        let was_authenticated = self.authenticated.swap(authenticated, Ordering::SeqCst);
        if !authenticated || was_authenticated {
            return Ok(None);
        }

        {
            let mut last = self
                .last_reconcile
                .lock()
                .map_err(|_| Error::Storage("Login guard lock poisoned".to_string()))?;
            if let Some(at) = *last {
                if at.elapsed() < self.config.login_guard() {
                    debug!("Login reconciliation ran recently, skipping");
                    return Ok(None);
                }
            }
            *last = Some(Instant::now());
        }

        self.auth_prompted.store(false, Ordering::SeqCst);

        let snapshots = self.backups.list_snapshots().await?;
        let Some(newest) = SnapshotInfo::newest(&snapshots) else {
            info!("No remote backup found after sign-in");
            return Ok(None);
        };

        self.restore_snapshot(newest.id.clone()).await.map(Some)
    }

    fn record_outcome(&self, outcome: SyncOutcome) -> Result<()> {
        let mut metadata = self.store.sync_metadata()?;
        metadata.last_sync_status = Some(outcome);
        self.store.put_sync_metadata(&metadata)
    }
}
