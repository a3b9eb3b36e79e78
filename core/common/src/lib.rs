//! Common utilities and types shared across LiftSync modules.
//!
//! This module provides the error taxonomy, the workout domain model and
//! the records exchanged between the local store, the credential tiers
//! and the backup repository.

pub mod credential;
pub mod error;
pub mod snapshot;
pub mod token;
pub mod trigger;
pub mod types;
pub mod workout;

pub use credential::{StoredCredential, DEFAULT_BUFFER_WINDOW_SECS};
pub use error::{Error, Result};
pub use snapshot::{SnapshotData, SnapshotPayload, SyncMetadata, SyncOutcome, SNAPSHOT_VERSION};
pub use token::{AccessTokenSource, StaticToken};
pub use trigger::{ThrottlePolicy, TriggerReason};
pub use types::{Secret, UserId};
pub use workout::{
    Equipment, Exercise, ExerciseBlock, MuscleGroup, SessionExercise, SessionStatus, SetRecord,
    TemplateExercise, WorkoutSession, WorkoutTemplate,
};
