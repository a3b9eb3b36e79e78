//! Application facade.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use liftsync_auth::{
    CredentialTier, HttpTokenVault, OAuthRefreshClient, TokenCache, TokenLifecycleManager,
};
use liftsync_common::{
    Error, Exercise, Result, Secret, SnapshotData, StoredCredential, SyncMetadata, TriggerReason,
    UserId, WorkoutSession,
};
use liftsync_storage::{BackupRepository, DriveBackupRepository, SnapshotInfo};
use liftsync_store::{ImportSummary, LocalStore};
use liftsync_sync::{
    BackgroundSync, LogNotifier, RestoreReport, SyncCoordinator, SyncNotifier, SyncReport,
};

use crate::config::AppConfig;
use crate::watcher::SessionWatcher;

/// Recorded sets between two `SetsBatched` sync requests.
pub const SETS_PER_BATCH: usize = 10;

/// The collaborator-facing API of LiftSync.
///
/// Cheap to share behind an `Arc`; all components are internally
/// synchronized.
pub struct LiftSync {
    config: AppConfig,
    user_id: UserId,
    store: Arc<LocalStore>,
    tokens: Arc<TokenLifecycleManager>,
    coordinator: Arc<SyncCoordinator>,
}

impl LiftSync {
    /// Open the local database and build the remote clients from `config`.
    pub fn open(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let user_id = config.user_id()?;
        let store = Arc::new(LocalStore::open(&config.database_path)?);

        let mut tiers: Vec<Arc<dyn CredentialTier>> = vec![Arc::new(TokenCache::new(store.clone()))];
        if let Some(vault) = HttpTokenVault::from_config(&config.vault)? {
            tiers.push(Arc::new(vault));
        }
        let refresher = Arc::new(OAuthRefreshClient::new(&config.auth)?);
        let tokens = Arc::new(TokenLifecycleManager::new(
            tiers,
            refresher,
            config.auth.buffer_window(),
        ));

        let backups = Arc::new(DriveBackupRepository::new(
            config.drive.clone(),
            Arc::new(tokens.for_user(user_id.clone())),
        )?);

        info!("Opened LiftSync for {}", user_id);
        Ok(Self::from_parts(
            config,
            user_id,
            store,
            tokens,
            backups,
            Arc::new(LogNotifier),
        ))
    }

    /// Assemble from already-built components.
    pub fn from_parts(
        config: AppConfig,
        user_id: UserId,
        store: Arc<LocalStore>,
        tokens: Arc<TokenLifecycleManager>,
        backups: Arc<dyn BackupRepository>,
        notifier: Arc<dyn SyncNotifier>,
    ) -> Self {
        let coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            backups,
            notifier,
            config.sync.clone(),
        ));
        Self {
            config,
            user_id,
            store,
            tokens,
            coordinator,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Request a throttled background sync. Never fails.
    pub fn start_sync(&self, trigger: TriggerReason) -> JoinHandle<()> {
        self.coordinator.maybe_sync(trigger)
    }

    /// Upload a snapshot now, ignoring the throttle.
    pub async fn force_sync(&self) -> Result<SyncReport> {
        self.coordinator.manual_sync().await
    }

    pub async fn list_backups(&self) -> Result<Vec<SnapshotInfo>> {
        self.coordinator.backups().list_snapshots().await
    }

    /// Replace local data with a backup; the newest when `id` is `None`.
    pub async fn restore(&self, id: Option<&str>) -> Result<RestoreReport> {
        self.coordinator.restore(id).await
    }

    pub async fn delete_backup(&self, id: &str) -> Result<()> {
        self.coordinator.backups().delete_snapshot(id).await
    }

    pub async fn get_valid_access_token(&self) -> Result<Option<Secret>> {
        self.tokens.get_valid_access_token(&self.user_id).await
    }

    /// Store the output of the sign-in flow and reconcile with the newest
    /// remote backup.
    pub async fn sign_in(
        &self,
        access_token: Secret,
        refresh_token: Option<Secret>,
        expires_in: Duration,
    ) -> Result<Option<RestoreReport>> {
        let credential = StoredCredential::new(
            self.user_id.clone(),
            access_token,
            refresh_token,
            Utc::now() + expires_in,
        );
        self.tokens.store_credential(&credential).await?;
        self.coordinator.handle_auth_change(true).await
    }

    /// Re-derive the signed-in state from the credential tiers.
    ///
    /// Call at startup; a usable credential counts as a fresh login.
    pub async fn refresh_auth_state(&self) -> Result<Option<RestoreReport>> {
        let authenticated = match self.get_valid_access_token().await {
            Ok(token) => token.is_some(),
            Err(e) if e.is_auth() => false,
            Err(e) => return Err(e),
        };
        self.coordinator.handle_auth_change(authenticated).await
    }

    /// Forget the credential everywhere.
    pub async fn disconnect(&self) -> Result<()> {
        self.tokens.disconnect(&self.user_id).await?;
        self.coordinator.handle_auth_change(false).await?;
        Ok(())
    }

    pub fn status(&self) -> Result<SyncMetadata> {
        self.coordinator.status()
    }

    pub fn export(&self) -> Result<SnapshotData> {
        self.store.export_all()
    }

    /// Merge entities into the local store, replacing same-id records.
    pub fn import(&self, data: &SnapshotData) -> Result<ImportSummary> {
        let summary = self.store.import_all(data)?;
        if summary.exercises + summary.templates + summary.workouts == 0 {
            warn!("Import contained no entities");
        }
        Ok(summary)
    }

    /// Record a set in a stored session and mark its exercise as used.
    ///
    /// Every [`SETS_PER_BATCH`]th set of the session requests a
    /// `SetsBatched` sync.
    pub async fn record_set(
        &self,
        session_id: &str,
        exercise_index: usize,
        reps: u32,
        weight: f64,
    ) -> Result<WorkoutSession> {
        let now = Utc::now();
        let mut session = self.store.get::<WorkoutSession>(session_id)?;
        session.record_set(exercise_index, reps, weight, now)?;
        self.store.update(&session)?;

        if let Some(entry) = session.exercises.get(exercise_index) {
            match self.store.get::<Exercise>(&entry.exercise_id) {
                Ok(mut exercise) => {
                    exercise.touch(now);
                    self.store.update(&exercise)?;
                }
                Err(Error::NotFound(_)) => debug!(
                    "Session {} references missing exercise {}",
                    session_id, entry.exercise_id
                ),
                Err(e) => return Err(e),
            }
        }

        if session.set_count() % SETS_PER_BATCH == 0 {
            self.start_sync(TriggerReason::SetsBatched);
        }
        Ok(session)
    }

    /// Start the periodic background sync timer.
    pub fn start_background_sync(&self) -> BackgroundSync {
        BackgroundSync::from_config(self.coordinator.clone())
    }

    /// Watch an open session and end it after the configured idle time.
    pub fn watch_session(&self, session_id: impl Into<String>) -> SessionWatcher {
        SessionWatcher::start(
            self.store.clone(),
            self.coordinator.clone(),
            session_id.into(),
            self.config.inactivity_window(),
            self.config.inactivity_poll(),
        )
    }
}
