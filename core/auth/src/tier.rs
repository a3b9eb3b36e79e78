//! Credential tier abstraction.

use async_trait::async_trait;

use liftsync_common::{Result, StoredCredential, UserId};

/// One storage location for credentials.
///
/// Tiers are consulted in order; earlier tiers are cheaper to reach.
#[async_trait]
pub trait CredentialTier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn read(&self, user_id: &UserId) -> Result<Option<StoredCredential>>;

    /// Store a credential, last writer wins.
    ///
    /// A credential without a refresh token must not erase one the tier
    /// already holds.
    async fn write(&self, credential: &StoredCredential) -> Result<()>;

    async fn remove(&self, user_id: &UserId) -> Result<()>;
}
