//! Periodic background sync.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use liftsync_common::TriggerReason;

use crate::coordinator::SyncCoordinator;

/// Period used when a zero period is configured.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Timer task issuing `PeriodicTick` triggers.
///
/// The first tick fires immediately, so an overdue daily backup runs at
/// startup. Each tick goes through the normal throttle. Stops on
/// [`BackgroundSync::shutdown`] or when dropped.
pub struct BackgroundSync {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl BackgroundSync {
    /// Spawn the timer. Must be called inside a tokio runtime.
    ///
    /// A zero `period` is raised to [`MIN_PERIOD`].
    pub fn start(coordinator: Arc<SyncCoordinator>, period: Duration) -> Self {
        let period = if period.is_zero() {
            warn!("Background sync period is zero, using {:?}", MIN_PERIOD);
            MIN_PERIOD
        } else {
            period
        };
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Background sync started (every {:?})", period);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Background sync shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        debug!("Periodic sync tick");
                        coordinator.run_trigger(TriggerReason::PeriodicTick).await;
                    }
                }
            }
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Start with the coordinator's configured period.
    pub fn from_config(coordinator: Arc<SyncCoordinator>) -> Self {
        let period = coordinator.config().periodic_interval();
        Self::start(coordinator, period)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the timer and wait for an in-flight tick to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for BackgroundSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
