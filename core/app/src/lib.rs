//! LiftSync application layer.
//!
//! Wires the local store, the credential lifecycle, the backup repository
//! and the sync coordinator into one facade, and loads the JSON
//! configuration that drives them.

pub mod app;
pub mod config;
pub mod watcher;

pub use app::{LiftSync, SETS_PER_BATCH};
pub use config::AppConfig;
pub use watcher::{SessionWatcher, WatchState};
