//! Seam between credential management and remote API clients.

use async_trait::async_trait;

use crate::types::Secret;
use crate::Result;

/// Supplies bearer tokens to remote API clients.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A currently valid access token.
    ///
    /// # Errors
    /// - `AuthRequired` if no credential can be obtained
    /// - `AuthExpired` if the refresh token was rejected
    async fn access_token(&self) -> Result<Secret>;
}

/// A fixed token, for tools and tests that already hold one.
pub struct StaticToken(pub Secret);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<Secret> {
        Ok(self.0.clone())
    }
}
