//! LiftSync backup synchronization.
//!
//! This module decides when the local store is snapshotted to the remote
//! backup repository and restores it from there:
//! - per-trigger throttling against the last successful sync
//! - fire-and-forget background syncs and awaited manual syncs
//! - retention rotation after every upload
//! - whole-snapshot restore and fresh-login reconciliation
//! - a periodic background timer

pub mod coordinator;
pub mod notifier;
pub mod scheduler;

pub use coordinator::{RestoreReport, SyncConfig, SyncCoordinator, SyncReport};
pub use notifier::{LogNotifier, SyncNotifier};
pub use scheduler::BackgroundSync;
