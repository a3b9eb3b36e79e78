//! In-memory backup repository for testing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use liftsync_common::{Error, Result, SnapshotPayload};

use crate::gdrive::snapshot_name;
use crate::repository::{BackupRepository, SnapshotInfo};

/// Simulated remote failure applied to every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    None,
    /// Behave as if the remote answered 401.
    AuthExpired,
    /// Behave as if the remote could not be reached.
    Unavailable,
}

#[derive(Debug, Clone)]
struct Entry {
    info: SnapshotInfo,
    body: serde_json::Value,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    last_created: Option<DateTime<Utc>>,
    failure: FailureMode,
    failing_deletes: HashSet<String>,
}

/// In-memory backup repository.
///
/// Creation times are strictly increasing, so "newest" is unambiguous even
/// for snapshots created within the same clock tick. All data is lost on
/// drop.
#[derive(Clone, Default)]
pub struct MemoryBackupRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryBackupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::Storage("Backup repository lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::Storage("Backup repository lock poisoned".to_string()))
    }

    fn check_failure(&self) -> Result<()> {
        match self.read()?.failure {
            FailureMode::None => Ok(()),
            FailureMode::AuthExpired => Err(Error::AuthExpired("401 Unauthorized".to_string())),
            FailureMode::Unavailable => {
                Err(Error::RemoteUnavailable("connection refused".to_string()))
            }
        }
    }

    /// Make every subsequent operation fail in the given way.
    pub fn set_failure(&self, failure: FailureMode) {
        if let Ok(mut state) = self.write() {
            state.failure = failure;
        }
    }

    /// Make deletion of `id` fail while other operations keep working.
    pub fn fail_delete(&self, id: &str) {
        if let Ok(mut state) = self.write() {
            state.failing_deletes.insert(id.to_string());
        }
    }

    /// Insert a snapshot with an explicit creation time. Returns its id.
    pub fn seed(&self, created_at: DateTime<Utc>, body: serde_json::Value) -> Result<String> {
        let mut state = self.write()?;
        let id = Uuid::new_v4().to_string();
        let info = SnapshotInfo {
            id: id.clone(),
            name: snapshot_name(created_at),
            created_at,
        };
        state.last_created = state.last_created.max(Some(created_at));
        state.entries.insert(id.clone(), Entry { info, body });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read()
            .map(|s| s.entries.contains_key(id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl BackupRepository for MemoryBackupRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_snapshot(&self, payload: &SnapshotPayload) -> Result<String> {
        self.check_failure()?;
        let body = serde_json::to_value(payload)?;

        let mut state = self.write()?;
        let now = Utc::now();
        let created_at = match state.last_created {
            Some(last) if last >= now => last + Duration::milliseconds(1),
            _ => now,
        };
        state.last_created = Some(created_at);

        let id = Uuid::new_v4().to_string();
        let info = SnapshotInfo {
            id: id.clone(),
            name: snapshot_name(created_at),
            created_at,
        };
        state.entries.insert(id.clone(), Entry { info, body });
        Ok(id)
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        self.check_failure()?;
        let mut snapshots: Vec<SnapshotInfo> = self
            .read()?
            .entries
            .values()
            .map(|e| e.info.clone())
            .collect();
        SnapshotInfo::sort_newest_first(&mut snapshots);
        Ok(snapshots)
    }

    async fn fetch_snapshot(&self, id: &str) -> Result<serde_json::Value> {
        self.check_failure()?;
        self.read()?
            .entries
            .get(id)
            .map(|e| e.body.clone())
            .ok_or_else(|| Error::NotFound(format!("Snapshot not found: {}", id)))
    }

    async fn delete_snapshot(&self, id: &str) -> Result<()> {
        self.check_failure()?;
        let mut state = self.write()?;
        if state.failing_deletes.contains(id) {
            return Err(Error::RemoteUnavailable(format!("Delete of {} failed", id)));
        }
        state
            .entries
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Snapshot not found: {}", id)))
    }
}
