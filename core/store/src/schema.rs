//! Database schema.

pub(crate) const ENTITY_TABLES: [&str; 3] = ["exercises", "templates", "workouts"];

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS exercises (
    id TEXT PRIMARY KEY,
    index_key TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exercises_key ON exercises(index_key);

CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    index_key TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_templates_key ON templates(index_key);

CREATE TABLE IF NOT EXISTS workouts (
    id TEXT PRIMARY KEY,
    index_key TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_workouts_key ON workouts(index_key);

CREATE TABLE IF NOT EXISTS sync_metadata (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    body TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS credentials (
    user_id TEXT PRIMARY KEY,
    body TEXT NOT NULL
);
"#;
