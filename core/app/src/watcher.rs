//! Session inactivity watcher.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use liftsync_common::{Error, Result, TriggerReason, WorkoutSession};
use liftsync_store::LocalStore;
use liftsync_sync::SyncCoordinator;

/// Result of one inactivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Session still open and recently active.
    Active,
    /// Session was ended by this check.
    AutoEnded,
    /// Session already terminal or gone; nothing left to watch.
    Finished,
}

/// Polls one session and ends it once it has been idle too long.
///
/// On auto-end the session is persisted as `EndedEarly` and a
/// `SessionAutoEnded` sync is requested. The watcher stops itself once the
/// session is terminal.
pub struct SessionWatcher {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionWatcher {
    /// Spawn the polling task. Must be called inside a tokio runtime.
    ///
    /// A zero `poll` interval is raised to one second.
    pub fn start(
        store: Arc<LocalStore>,
        coordinator: Arc<SyncCoordinator>,
        session_id: String,
        window: Duration,
        poll: std::time::Duration,
    ) -> Self {
        let poll = if poll.is_zero() {
            warn!("Inactivity poll interval is zero, using 1s");
            std::time::Duration::from_secs(1)
        } else {
            poll
        };
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval(poll);
            debug!("Watching session {} for inactivity", session_id);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match Self::check(&store, &session_id, window, Utc::now()) {
                            Ok(WatchState::Active) => {}
                            Ok(WatchState::AutoEnded) => {
                                coordinator.maybe_sync(TriggerReason::SessionAutoEnded);
                                break;
                            }
                            Ok(WatchState::Finished) => break,
                            Err(e) => warn!("Inactivity check for {} failed: {}", session_id, e),
                        }
                    }
                }
            }
            debug!("Stopped watching session {}", session_id);
        });

        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Check a stored session once at `now`, ending it if idle.
    pub fn check(
        store: &LocalStore,
        session_id: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<WatchState> {
        let mut session = match store.get::<WorkoutSession>(session_id) {
            Ok(session) => session,
            Err(Error::NotFound(_)) => return Ok(WatchState::Finished),
            Err(e) => return Err(e),
        };

        if session.status.is_terminal() {
            return Ok(WatchState::Finished);
        }
        if !session.auto_end_if_inactive(window, now) {
            return Ok(WatchState::Active);
        }

        store.update(&session)?;
        info!("Session {} ended after inactivity", session_id);
        Ok(WatchState::AutoEnded)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Wait until the watcher stops on its own.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Stop watching.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
