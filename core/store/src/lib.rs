//! Client-resident structured store for LiftSync.
//!
//! A single SQLite database holds the workout entities, the sync
//! bookkeeping record and the per-user credential cache. Every call runs in
//! its own transaction scope; bulk import is atomic per entity type only.

pub mod entity;
pub mod local;
mod records;
mod schema;

pub use entity::Entity;
pub use local::{ImportSummary, LocalStore};
