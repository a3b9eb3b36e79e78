//! Token lifecycle: resolve, back-fill, refresh, write back.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use liftsync_common::{AccessTokenSource, Error, Result, Secret, StoredCredential, UserId};

use crate::refresh::RefreshClient;
use crate::tier::CredentialTier;

/// Resolves valid access tokens on demand.
///
/// Tiers are tried in order. The first tier holding a usable credential
/// (fresh, or stale with a refresh token) wins; earlier tiers are
/// back-filled with it. Stale credentials are refreshed once and the result
/// is written to every tier.
pub struct TokenLifecycleManager {
    tiers: Vec<Arc<dyn CredentialTier>>,
    refresher: Arc<dyn RefreshClient>,
    buffer: Duration,
    /// Serializes refreshes so concurrent callers do not spend the same
    /// refresh token twice.
    refresh_lock: Mutex<()>,
}

impl TokenLifecycleManager {
    pub fn new(
        tiers: Vec<Arc<dyn CredentialTier>>,
        refresher: Arc<dyn RefreshClient>,
        buffer: Duration,
    ) -> Self {
        Self {
            tiers,
            refresher,
            buffer,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Get a valid access token for `user_id`.
    ///
    /// Returns `Ok(None)` when every tier was read and none holds a usable
    /// credential; callers treat that as "authentication required".
    ///
    /// # Errors
    /// - `AuthExpired` if the refresh token was rejected (re-consent needed)
    /// - `RemoteUnavailable` if the refresh could not reach the provider, or
    ///   a tier could not be read and no other tier had a usable credential
    pub async fn get_valid_access_token(&self, user_id: &UserId) -> Result<Option<Secret>> {
        let Some(credential) = self.resolve(user_id).await? else {
            debug!("No usable credential for {}", user_id);
            return Ok(None);
        };

        if credential.is_fresh(self.buffer, Utc::now()) {
            return Ok(Some(credential.access_token));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let Some(credential) = self.resolve(user_id).await? else {
            return Ok(None);
        };
        if credential.is_fresh(self.buffer, Utc::now()) {
            return Ok(Some(credential.access_token));
        }

        let refreshed = self.refresh(credential).await?;
        Ok(Some(refreshed.access_token))
    }

    /// Store a credential obtained from the sign-in flow in every tier.
    pub async fn store_credential(&self, credential: &StoredCredential) -> Result<()> {
        let mut first_tier = true;
        for tier in &self.tiers {
            match tier.write(credential).await {
                Ok(()) => {}
                Err(e) if first_tier => return Err(e),
                Err(e) => warn!("Failed to mirror credential into {}: {}", tier.name(), e),
            }
            first_tier = false;
        }
        info!("Stored credential for {}", credential.user_id);
        Ok(())
    }

    /// Forget the user's credential everywhere.
    ///
    /// This is the only path that drops a refresh token.
    pub async fn disconnect(&self, user_id: &UserId) -> Result<()> {
        let mut first_error = None;
        for tier in &self.tiers {
            if let Err(e) = tier.remove(user_id).await {
                warn!("Failed to remove credential from {}: {}", tier.name(), e);
                first_error.get_or_insert(e);
            }
        }
        info!("Disconnected {}", user_id);
        first_error.map_or(Ok(()), Err)
    }

    /// Bind this manager to one user as an [`AccessTokenSource`].
    pub fn for_user(self: &Arc<Self>, user_id: UserId) -> UserTokens {
        UserTokens {
            manager: self.clone(),
            user_id,
        }
    }

    /// First usable credential across the tiers.
    ///
    /// An unreadable tier does not stop the search, but when nothing usable
    /// turns up its error is returned instead of `None`.
    async fn resolve(&self, user_id: &UserId) -> Result<Option<StoredCredential>> {
        let now = Utc::now();
        let mut first_error = None;
        for (index, tier) in self.tiers.iter().enumerate() {
            let credential = match tier.read(user_id).await {
                Ok(Some(credential)) => credential,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Credential tier {} unavailable: {}", tier.name(), e);
                    first_error.get_or_insert(e);
                    continue;
                }
            };

            if !credential.is_fresh(self.buffer, now) && !credential.can_refresh() {
                debug!("Credential in {} is stale and not refreshable", tier.name());
                continue;
            }

            if index > 0 {
                debug!("Credential found in {}, back-filling earlier tiers", tier.name());
                self.write_tiers(&credential, index).await;
            }
            return Ok(Some(credential));
        }
        first_error.map_or(Ok(None), Err)
    }

    async fn refresh(&self, credential: StoredCredential) -> Result<StoredCredential> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or(Error::AuthRequired)?;

        info!("Refreshing access token for {}", credential.user_id);
        let refreshed = self.refresher.refresh(&refresh_token).await?;

        let updated = StoredCredential {
            user_id: credential.user_id.clone(),
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
            expires_at: refreshed.expires_at,
            updated_at: Utc::now(),
        };
        self.write_tiers(&updated, self.tiers.len()).await;
        Ok(updated)
    }

    /// Best-effort write of `credential` into the first `count` tiers.
    async fn write_tiers(&self, credential: &StoredCredential, count: usize) {
        for tier in self.tiers.iter().take(count) {
            if let Err(e) = tier.write(credential).await {
                warn!("Failed to write credential into {}: {}", tier.name(), e);
            }
        }
    }
}

/// A [`TokenLifecycleManager`] bound to one user.
#[derive(Clone)]
pub struct UserTokens {
    manager: Arc<TokenLifecycleManager>,
    user_id: UserId,
}

impl UserTokens {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

#[async_trait]
impl AccessTokenSource for UserTokens {
    async fn access_token(&self) -> Result<Secret> {
        self.manager
            .get_valid_access_token(&self.user_id)
            .await?
            .ok_or(Error::AuthRequired)
    }
}
