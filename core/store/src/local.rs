//! SQLite-backed local store.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

use liftsync_common::{Error, Exercise, Result, SnapshotData, WorkoutSession, WorkoutTemplate};

use crate::entity::Entity;
use crate::schema::{ENTITY_TABLES, SCHEMA};

/// Counts of entities written by [`LocalStore::import_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub exercises: usize,
    pub templates: usize,
    pub workouts: usize,
}

/// Local structured store.
///
/// The connection is guarded by a mutex, so calls on one store are
/// serialized; each call is its own transaction scope.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Create or open a store database.
    ///
    /// # Errors
    /// - Database creation or schema setup failure
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path).map_err(sqlite_err)?;
        let store = Self::init(conn)?;
        info!("Local store opened at {}", db_path.display());
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sqlite_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(sqlite_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("Store connection lock poisoned".to_string()))
    }

    /// Insert a new entity.
    ///
    /// # Errors
    /// - `Conflict` if an entity with the same id exists
    pub fn create<E: Entity>(&self, entity: &E) -> Result<()> {
        let body = serde_json::to_string(entity)?;
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO {} (id, index_key, body) VALUES (?1, ?2, ?3)",
            E::TABLE
        );

        match conn.execute(&sql, params![entity.id(), entity.index_key(), body]) {
            Ok(_) => {
                debug!("Created {} {}", E::KIND, entity.id());
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(Error::Conflict(format!(
                "{} {} already exists",
                E::KIND,
                entity.id()
            ))),
            Err(e) => Err(sqlite_err(e)),
        }
    }

    /// Fetch an entity by id.
    ///
    /// # Errors
    /// - `NotFound` if absent
    pub fn get<E: Entity>(&self, id: &str) -> Result<E> {
        let conn = self.conn()?;
        let sql = format!("SELECT body FROM {} WHERE id = ?1", E::TABLE);
        let body: Option<String> = conn
            .query_row(&sql, [id], |row| row.get(0))
            .optional()
            .map_err(sqlite_err)?;

        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Err(Error::NotFound(format!("{} {}", E::KIND, id))),
        }
    }

    /// All entities of one type, unordered.
    pub fn get_all<E: Entity>(&self) -> Result<Vec<E>> {
        let conn = self.conn()?;
        let sql = format!("SELECT body FROM {}", E::TABLE);
        query_bodies(&conn, &sql, [])
    }

    /// Entities whose secondary index equals `key`, unordered.
    pub fn find_by_index<E: Entity>(&self, key: &str) -> Result<Vec<E>> {
        let conn = self.conn()?;
        let sql = format!("SELECT body FROM {} WHERE index_key = ?1", E::TABLE);
        query_bodies(&conn, &sql, [key])
    }

    /// Replace an existing entity.
    ///
    /// # Errors
    /// - `NotFound` if no entity has this id
    pub fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        let body = serde_json::to_string(entity)?;
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE {} SET index_key = ?2, body = ?3 WHERE id = ?1",
            E::TABLE
        );
        let changed = conn
            .execute(&sql, params![entity.id(), entity.index_key(), body])
            .map_err(sqlite_err)?;

        if changed == 0 {
            return Err(Error::NotFound(format!("{} {}", E::KIND, entity.id())));
        }
        debug!("Updated {} {}", E::KIND, entity.id());
        Ok(())
    }

    /// Delete an entity. References held by other entities are left as is.
    ///
    /// # Errors
    /// - `NotFound` if no entity has this id
    pub fn delete<E: Entity>(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", E::TABLE);
        let changed = conn.execute(&sql, [id]).map_err(sqlite_err)?;

        if changed == 0 {
            return Err(Error::NotFound(format!("{} {}", E::KIND, id)));
        }
        debug!("Deleted {} {}", E::KIND, id);
        Ok(())
    }

    /// Export every domain entity.
    pub fn export_all(&self) -> Result<SnapshotData> {
        Ok(SnapshotData {
            exercises: self.get_all::<Exercise>()?,
            templates: self.get_all::<WorkoutTemplate>()?,
            workouts: self.get_all::<WorkoutSession>()?,
        })
    }

    /// Upsert a (possibly partial) snapshot.
    ///
    /// Each entity type is written in its own transaction. A failure in one
    /// type does not roll back the others; the first error is returned after
    /// all types were attempted.
    pub fn import_all(&self, data: &SnapshotData) -> Result<ImportSummary> {
        let mut first_error = None;
        let mut summary = ImportSummary::default();

        match self.import_entities(&data.exercises) {
            Ok(n) => summary.exercises = n,
            Err(e) => record_import_error::<Exercise>(&mut first_error, e),
        }
        match self.import_entities(&data.templates) {
            Ok(n) => summary.templates = n,
            Err(e) => record_import_error::<WorkoutTemplate>(&mut first_error, e),
        }
        match self.import_entities(&data.workouts) {
            Ok(n) => summary.workouts = n,
            Err(e) => record_import_error::<WorkoutSession>(&mut first_error, e),
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    "Imported {} exercises, {} templates, {} workouts",
                    summary.exercises, summary.templates, summary.workouts
                );
                Ok(summary)
            }
        }
    }

    /// Remove every domain entity. Sync metadata and credentials survive.
    pub fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(sqlite_err)?;
        for table in ENTITY_TABLES {
            tx.execute(&format!("DELETE FROM {}", table), [])
                .map_err(sqlite_err)?;
        }
        tx.commit().map_err(sqlite_err)?;
        info!("Cleared local store");
        Ok(())
    }

    /// Number of stored entities of one type.
    pub fn count<E: Entity>(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", E::TABLE), [], |row| {
                row.get(0)
            })
            .map_err(sqlite_err)?;
        Ok(count as u64)
    }

    fn import_entities<E: Entity>(&self, entities: &[E]) -> Result<usize> {
        if entities.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(sqlite_err)?;
        upsert_all(&tx, entities)?;
        tx.commit().map_err(sqlite_err)?;
        Ok(entities.len())
    }
}

fn upsert_all<E: Entity>(tx: &Transaction<'_>, entities: &[E]) -> Result<()> {
    let sql = format!(
        "INSERT OR REPLACE INTO {} (id, index_key, body) VALUES (?1, ?2, ?3)",
        E::TABLE
    );
    let mut stmt = tx.prepare(&sql).map_err(sqlite_err)?;
    for entity in entities {
        let body = serde_json::to_string(entity)?;
        stmt.execute(params![entity.id(), entity.index_key(), body])
            .map_err(sqlite_err)?;
    }
    Ok(())
}

fn record_import_error<E: Entity>(slot: &mut Option<Error>, err: Error) {
    error!("Import of {} entities failed: {}", E::KIND, err);
    if slot.is_none() {
        *slot = Some(err);
    }
}

fn query_bodies<E: Entity, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<E>> {
    let mut stmt = conn.prepare(sql).map_err(sqlite_err)?;
    let bodies = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .map_err(sqlite_err)?;

    let mut result = Vec::new();
    for body in bodies {
        let body = body.map_err(sqlite_err)?;
        result.push(serde_json::from_str(&body)?);
    }
    Ok(result)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

pub(crate) fn sqlite_err(err: rusqlite::Error) -> Error {
    Error::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Utc, Weekday};
    use liftsync_common::{Equipment, MuscleGroup, SessionStatus, TemplateExercise};
    use tempfile::TempDir;

    fn squat() -> Exercise {
        Exercise::new(
            "squat",
            "Back Squat",
            MuscleGroup::Legs,
            Equipment::Barbell { bar_weight: 20.0 },
        )
    }

    fn leg_day() -> WorkoutTemplate {
        WorkoutTemplate::new(
            "legs",
            "Leg Day",
            MuscleGroup::Legs,
            Weekday::Wed,
            vec![TemplateExercise::new("squat", 5)],
        )
    }

    fn seeded_store() -> LocalStore {
        let store = LocalStore::in_memory().unwrap();
        store.create(&squat()).unwrap();
        store
            .create(&Exercise::new("curl", "Curl", MuscleGroup::Biceps, Equipment::Dumbbell))
            .unwrap();
        store.create(&leg_day()).unwrap();

        let mut session = WorkoutSession::from_template("w1", &leg_day(), Utc::now());
        session.record_set(0, 5, 100.0, Utc::now()).unwrap();
        store.create(&session).unwrap();
        store
    }

    #[test]
    fn test_create_get_round_trip() {
        let store = LocalStore::in_memory().unwrap();
        let exercise = squat();
        store.create(&exercise).unwrap();

        let loaded: Exercise = store.get("squat").unwrap();
        assert_eq!(loaded, exercise);
    }

    #[test]
    fn test_duplicate_create_conflicts() {
        let store = LocalStore::in_memory().unwrap();
        store.create(&squat()).unwrap();
        let err = store.create(&squat()).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_update_reflects_changes() {
        let store = LocalStore::in_memory().unwrap();
        let mut exercise = squat();
        store.create(&exercise).unwrap();

        exercise.name = "High-bar Squat".to_string();
        exercise.default_rest_seconds = 180;
        store.update(&exercise).unwrap();

        let loaded: Exercise = store.get("squat").unwrap();
        assert_eq!(loaded.name, "High-bar Squat");
        assert_eq!(loaded.default_rest_seconds, 180);
        assert_eq!(loaded.created_at, exercise.created_at);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = LocalStore::in_memory().unwrap();
        let err = store.update(&squat()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let store = seeded_store();
        store.delete::<Exercise>("squat").unwrap();

        assert!(matches!(store.get::<Exercise>("squat"), Err(Error::NotFound(_))));
        assert!(matches!(store.delete::<Exercise>("squat"), Err(Error::NotFound(_))));

        // The template keeps its dangling reference.
        let template: WorkoutTemplate = store.get("legs").unwrap();
        assert_eq!(template.exercises[0].exercise_id, "squat");
    }

    #[test]
    fn test_find_by_index() {
        let store = seeded_store();

        let legs: Vec<Exercise> = store.find_by_index(MuscleGroup::Legs.as_str()).unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].id, "squat");

        let wednesday: Vec<WorkoutTemplate> = store.find_by_index("Wed").unwrap();
        assert_eq!(wednesday.len(), 1);

        let active: Vec<WorkoutSession> =
            store.find_by_index(SessionStatus::InProgress.as_str()).unwrap();
        assert_eq!(active.len(), 1);
        let paused: Vec<WorkoutSession> =
            store.find_by_index(SessionStatus::Paused.as_str()).unwrap();
        assert!(paused.is_empty());
    }

    #[test]
    fn test_index_follows_updates() {
        let store = seeded_store();
        let mut session: WorkoutSession = store.get("w1").unwrap();
        session.complete(Utc::now()).unwrap();
        store.update(&session).unwrap();

        let completed: Vec<WorkoutSession> =
            store.find_by_index(SessionStatus::Completed.as_str()).unwrap();
        assert_eq!(completed.len(), 1);
    }

    #[test]
    fn test_export_clear_import_round_trip() {
        let store = seeded_store();
        let mut exported = store.export_all().unwrap();

        store.clear_all().unwrap();
        assert_eq!(store.count::<Exercise>().unwrap(), 0);
        assert_eq!(store.count::<WorkoutSession>().unwrap(), 0);

        let summary = store.import_all(&exported).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                exercises: 2,
                templates: 1,
                workouts: 1
            }
        );

        let mut reimported = store.export_all().unwrap();
        exported.exercises.sort_by(|a, b| a.id.cmp(&b.id));
        reimported.exercises.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(reimported, exported);
    }

    #[test]
    fn test_import_partial_snapshot_upserts() {
        let store = seeded_store();
        let mut renamed = squat();
        renamed.name = "Front Squat".to_string();

        let partial = SnapshotData {
            exercises: vec![renamed],
            ..Default::default()
        };
        store.import_all(&partial).unwrap();

        let loaded: Exercise = store.get("squat").unwrap();
        assert_eq!(loaded.name, "Front Squat");
        assert_eq!(store.count::<WorkoutTemplate>().unwrap(), 1);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("liftsync.db");

        {
            let store = LocalStore::open(&path).unwrap();
            store.create(&squat()).unwrap();
        }

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.count::<Exercise>().unwrap(), 1);
    }

    #[test]
    fn test_import_failure_is_isolated_per_entity_type() {
        let store = LocalStore::in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_w2 BEFORE INSERT ON workouts
                 WHEN NEW.id = 'w2'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let data = SnapshotData {
            exercises: vec![squat()],
            templates: vec![leg_day()],
            workouts: vec![
                WorkoutSession::from_template("w1", &leg_day(), Utc::now()),
                WorkoutSession::from_template("w2", &leg_day(), Utc::now()),
            ],
        };

        assert!(matches!(store.import_all(&data), Err(Error::Storage(_))));

        // Exercises and templates committed; the workouts batch rolled back
        // as a whole, including the row inserted before the failure.
        assert_eq!(store.count::<Exercise>().unwrap(), 1);
        assert_eq!(store.count::<WorkoutTemplate>().unwrap(), 1);
        assert_eq!(store.count::<WorkoutSession>().unwrap(), 0);
    }
}
