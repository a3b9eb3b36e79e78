//! Sync trigger reasons and their throttle policies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Why a sync was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    SessionCompleted,
    SessionEndedEarly,
    SessionAutoEnded,
    /// Roughly ten sets were recorded since the last trigger.
    SetsBatched,
    TemplateModified,
    ExerciseModified,
    PeriodicTick,
    AppResumed,
    Manual,
}

/// Minimum spacing between successful syncs for one trigger kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub min_interval_minutes: i64,
}

impl TriggerReason {
    pub const ALL: [TriggerReason; 9] = [
        TriggerReason::SessionCompleted,
        TriggerReason::SessionEndedEarly,
        TriggerReason::SessionAutoEnded,
        TriggerReason::SetsBatched,
        TriggerReason::TemplateModified,
        TriggerReason::ExerciseModified,
        TriggerReason::PeriodicTick,
        TriggerReason::AppResumed,
        TriggerReason::Manual,
    ];

    pub fn policy(&self) -> ThrottlePolicy {
        let min_interval_minutes = match self {
            TriggerReason::SessionCompleted
            | TriggerReason::SessionEndedEarly
            | TriggerReason::SessionAutoEnded => 1,
            TriggerReason::SetsBatched => 10,
            TriggerReason::TemplateModified => 5,
            TriggerReason::PeriodicTick => 24 * 60,
            TriggerReason::ExerciseModified | TriggerReason::AppResumed | TriggerReason::Manual => 30,
        };
        ThrottlePolicy {
            min_interval_minutes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::SessionCompleted => "session_completed",
            TriggerReason::SessionEndedEarly => "session_ended_early",
            TriggerReason::SessionAutoEnded => "session_auto_ended",
            TriggerReason::SetsBatched => "sets_batched",
            TriggerReason::TemplateModified => "template_modified",
            TriggerReason::ExerciseModified => "exercise_modified",
            TriggerReason::PeriodicTick => "periodic_tick",
            TriggerReason::AppResumed => "app_resumed",
            TriggerReason::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerReason::ALL
            .iter()
            .copied()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown trigger reason: {}", s)))
    }
}
