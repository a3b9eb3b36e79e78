//! Snapshot payload format and sync bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trigger::TriggerReason;
use crate::workout::{Exercise, WorkoutSession, WorkoutTemplate};
use crate::Result;

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Outcome of the most recent sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Success,
    Failed,
    Pending,
}

/// Singleton sync bookkeeping record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// Time of the last successful sync.
    pub last_sync_time: Option<DateTime<Utc>>,
    pub last_sync_status: Option<SyncOutcome>,
    pub last_remote_id: Option<String>,
}

impl SyncMetadata {
    /// Minutes elapsed since the last successful sync, if any.
    pub fn minutes_since_sync(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_sync_time.map(|t| (now - t).num_minutes())
    }

    /// Whether a sync for `trigger` is due at `now`.
    pub fn is_due(&self, trigger: TriggerReason, now: DateTime<Utc>) -> bool {
        match self.minutes_since_sync(now) {
            None => true,
            Some(elapsed) => elapsed >= trigger.policy().min_interval_minutes,
        }
    }
}

/// All domain entities in one bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub templates: Vec<WorkoutTemplate>,
    #[serde(default)]
    pub workouts: Vec<WorkoutSession>,
}

impl SnapshotData {
    pub fn entity_count(&self) -> usize {
        self.exercises.len() + self.templates.len() + self.workouts.len()
    }

    /// Extract entity data from a fetched snapshot body.
    ///
    /// Accepts the current envelope, an envelope whose `data` holds one more
    /// legacy `data` level, and a bare entity bundle.
    pub fn from_payload_value(value: serde_json::Value) -> Result<Self> {
        let mut data = match value {
            serde_json::Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or_default()
            }
            other => other,
        };

        let nested = data
            .as_object()
            .map(|map| map.contains_key("data") && !map.contains_key("exercises"))
            .unwrap_or(false);
        if nested {
            data = data["data"].take();
        }

        Ok(serde_json::from_value(data)?)
    }
}

/// The object stored remotely for each backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub trigger_reason: TriggerReason,
    pub data: SnapshotData,
}

impl SnapshotPayload {
    pub fn new(trigger_reason: TriggerReason, data: SnapshotData) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: Utc::now(),
            trigger_reason,
            data,
        }
    }
}
