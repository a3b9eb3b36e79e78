//! Workout domain entities: exercises, templates and sessions.
//!
//! Identifiers are caller-supplied opaque strings. References between
//! entities (template -> exercise, session -> template) are plain ids and
//! may dangle after a delete; consumers resolve them defensively.

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Error, Result};

/// Default rest between sets when an exercise does not specify one.
pub const DEFAULT_REST_SECONDS: u32 = 90;

/// Muscle group tag for exercises and templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Legs,
    Glutes,
    Core,
    /// Sentinel used by templates that train everything.
    FullBody,
}

impl MuscleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Core => "core",
            MuscleGroup::FullBody => "full_body",
        }
    }
}

/// Equipment kind with its equipment-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Equipment {
    Barbell { bar_weight: f64 },
    Dumbbell,
    Machine { starting_weight: f64, increment: f64 },
    Cable { increment: f64 },
    Bodyweight,
    Other,
}

/// A single exercise definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub equipment: Equipment,
    pub default_rest_seconds: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Exercise {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        muscle_group: MuscleGroup,
        equipment: Equipment,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            muscle_group,
            equipment,
            default_rest_seconds: DEFAULT_REST_SECONDS,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Mark the exercise as used at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_used_at = Some(now);
    }
}

/// One entry in a template's ordered exercise list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExercise {
    pub exercise_id: String,
    pub target_sets: u32,
    /// Overrides the exercise's default rest.
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub superset_group: Option<String>,
    /// Position inside the superset group.
    #[serde(default)]
    pub superset_order: Option<u32>,
}

impl TemplateExercise {
    pub fn new(exercise_id: impl Into<String>, target_sets: u32) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            target_sets,
            rest_seconds: None,
            superset_group: None,
            superset_order: None,
        }
    }

    pub fn in_superset(mut self, group: impl Into<String>, order: u32) -> Self {
        self.superset_group = Some(group.into());
        self.superset_order = Some(order);
        self
    }
}

/// A block of a template as presented to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseBlock<'a> {
    Single(&'a TemplateExercise),
    Superset {
        group_id: &'a str,
        members: Vec<&'a TemplateExercise>,
    },
}

/// A reusable workout plan bound to a weekday.
///
/// At most one active template per weekday is expected; callers enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    pub target_muscle_group: MuscleGroup,
    pub day_of_week: Weekday,
    pub exercises: Vec<TemplateExercise>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutTemplate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        target_muscle_group: MuscleGroup,
        day_of_week: Weekday,
        exercises: Vec<TemplateExercise>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            target_muscle_group,
            day_of_week,
            exercises,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the grouped view of the exercise list.
    ///
    /// Blocks keep the position of their first member in the flat list.
    /// Superset members are sorted by their intra-group order; members
    /// without an order go last, keeping list order among themselves.
    pub fn grouped_exercises(&self) -> Vec<ExerciseBlock<'_>> {
        let mut blocks: Vec<ExerciseBlock<'_>> = Vec::new();
        let mut group_slots: HashMap<&str, usize> = HashMap::new();

        for entry in &self.exercises {
            match entry.superset_group.as_deref() {
                None => blocks.push(ExerciseBlock::Single(entry)),
                Some(group_id) => match group_slots.get(group_id) {
                    Some(&slot) => {
                        if let ExerciseBlock::Superset { members, .. } = &mut blocks[slot] {
                            members.push(entry);
                        }
                    }
                    None => {
                        group_slots.insert(group_id, blocks.len());
                        blocks.push(ExerciseBlock::Superset {
                            group_id,
                            members: vec![entry],
                        });
                    }
                },
            }
        }

        for block in &mut blocks {
            if let ExerciseBlock::Superset { members, .. } = block {
                members.sort_by_key(|m| m.superset_order.unwrap_or(u32::MAX));
            }
        }

        blocks
    }
}

/// Lifecycle state of a workout session.
///
/// `Paused -> InProgress -> {Completed | EndedEarly}`; `EndedEarly` is also
/// reachable from `Paused`. Terminal states never re-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Paused,
    InProgress,
    Completed,
    EndedEarly,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Paused => "paused",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::EndedEarly => "ended_early",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::EndedEarly)
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Paused, InProgress) | (Paused, EndedEarly) | (InProgress, Completed) | (InProgress, EndedEarly)
        )
    }
}

/// A recorded set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRecord {
    pub reps: u32,
    pub weight: f64,
    pub recorded_at: DateTime<Utc>,
}

impl SetRecord {
    pub fn volume(&self) -> f64 {
        f64::from(self.reps) * self.weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExercise {
    pub exercise_id: String,
    pub target_sets: u32,
    #[serde(default)]
    pub sets: Vec<SetRecord>,
}

/// A performed (or ongoing) workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    pub template_id: String,
    pub date: NaiveDate,
    pub status: SessionStatus,
    pub exercises: Vec<SessionExercise>,
    /// Cumulative active time in seconds.
    pub duration_seconds: u64,
    /// Sum of reps x weight over all recorded sets.
    pub total_volume: f64,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkoutSession {
    /// Start a session from a template. The session begins `Paused`.
    pub fn from_template(
        id: impl Into<String>,
        template: &WorkoutTemplate,
        now: DateTime<Utc>,
    ) -> Self {
        let exercises = template
            .exercises
            .iter()
            .map(|entry| SessionExercise {
                exercise_id: entry.exercise_id.clone(),
                target_sets: entry.target_sets,
                sets: Vec::new(),
            })
            .collect();

        Self {
            id: id.into(),
            template_id: template.id.clone(),
            date: now.date_naive(),
            status: SessionStatus::Paused,
            exercises,
            duration_seconds: 0,
            total_volume: 0.0,
            started_at: now,
            last_activity_at: now,
            ended_at: None,
        }
    }

    /// Record a set against the exercise at `exercise_index`.
    ///
    /// The first recorded set moves a paused session to `InProgress`.
    pub fn record_set(
        &mut self,
        exercise_index: usize,
        reps: u32,
        weight: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_open()?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidInput(format!("Invalid set weight: {}", weight)));
        }

        let exercise = self.exercises.get_mut(exercise_index).ok_or_else(|| {
            Error::InvalidInput(format!("No exercise at position {}", exercise_index))
        })?;

        let set = SetRecord {
            reps,
            weight,
            recorded_at: now,
        };
        self.total_volume += set.volume();
        exercise.sets.push(set);
        self.last_activity_at = now;

        if self.status == SessionStatus::Paused {
            self.status = SessionStatus::InProgress;
        }
        Ok(())
    }

    /// Accumulate active time.
    pub fn add_duration(&mut self, seconds: u64) -> Result<()> {
        self.ensure_open()?;
        self.duration_seconds = self.duration_seconds.saturating_add(seconds);
        Ok(())
    }

    /// Finish the session normally. Requires at least one recorded set.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(SessionStatus::Completed, now)
    }

    pub fn end_early(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(SessionStatus::EndedEarly, now)
    }

    /// End the session if nothing happened for longer than `window`.
    ///
    /// Returns whether the session was ended by this call.
    pub fn auto_end_if_inactive(&mut self, window: Duration, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() || now - self.last_activity_at < window {
            return false;
        }
        self.transition(SessionStatus::EndedEarly, now).is_ok()
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    /// Volume recomputed from the recorded sets.
    pub fn computed_volume(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .map(SetRecord::volume)
            .sum()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "Session {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidInput(format!(
                "Session {} cannot go from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        if next.is_terminal() {
            self.ended_at = Some(now);
        }
        Ok(())
    }
}
