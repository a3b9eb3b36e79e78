//! Device-local token cache backed by the local store.

use async_trait::async_trait;
use std::sync::Arc;

use liftsync_common::{Result, StoredCredential, UserId};
use liftsync_store::LocalStore;

use crate::tier::CredentialTier;

/// Token cache tier.
///
/// Subject to storage eviction; the vault tier is the fallback.
pub struct TokenCache {
    store: Arc<LocalStore>,
}

impl TokenCache {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialTier for TokenCache {
    fn name(&self) -> &str {
        "cache"
    }

    async fn read(&self, user_id: &UserId) -> Result<Option<StoredCredential>> {
        self.store.get_credential(user_id)
    }

    async fn write(&self, credential: &StoredCredential) -> Result<()> {
        self.store.put_credential(credential)
    }

    async fn remove(&self, user_id: &UserId) -> Result<()> {
        self.store.delete_credential(user_id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_cache_tier_round_trip() {
        let cache = TokenCache::new(Arc::new(LocalStore::in_memory().unwrap()));
        let user = UserId::new("u1").unwrap();
        assert!(cache.read(&user).await.unwrap().is_none());

        let credential = StoredCredential::new(user.clone(), "access", None, Utc::now());
        cache.write(&credential).await.unwrap();
        assert_eq!(cache.read(&user).await.unwrap(), Some(credential));

        cache.remove(&user).await.unwrap();
        assert!(cache.read(&user).await.unwrap().is_none());
    }
}
