//! Mapping of domain entities onto store tables.

use serde::de::DeserializeOwned;
use serde::Serialize;

use liftsync_common::{Exercise, WorkoutSession, WorkoutTemplate};

/// A domain entity kept in its own table with one secondary index.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Backing table name.
    const TABLE: &'static str;
    /// Human-readable kind used in error messages.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Value of the secondary index (muscle group, weekday, status).
    fn index_key(&self) -> String;
}

impl Entity for Exercise {
    const TABLE: &'static str = "exercises";
    const KIND: &'static str = "Exercise";

    fn id(&self) -> &str {
        &self.id
    }

    fn index_key(&self) -> String {
        self.muscle_group.as_str().to_string()
    }
}

impl Entity for WorkoutTemplate {
    const TABLE: &'static str = "templates";
    const KIND: &'static str = "WorkoutTemplate";

    fn id(&self) -> &str {
        &self.id
    }

    fn index_key(&self) -> String {
        self.day_of_week.to_string()
    }
}

impl Entity for WorkoutSession {
    const TABLE: &'static str = "workouts";
    const KIND: &'static str = "WorkoutSession";

    fn id(&self) -> &str {
        &self.id
    }

    fn index_key(&self) -> String {
        self.status.as_str().to_string()
    }
}
