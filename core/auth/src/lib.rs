//! Credential lifecycle for LiftSync.
//!
//! Access tokens are resolved through an ordered list of credential tiers:
//! - the device-local token cache (in the local store)
//! - an optional server-side token vault, consulted when the cache is empty
//!
//! Stale tokens are refreshed against the identity provider's token
//! endpoint and written back to every tier.

pub mod cache;
pub mod manager;
pub mod refresh;
pub mod tier;
pub mod vault;

pub use cache::TokenCache;
pub use manager::{TokenLifecycleManager, UserTokens};
pub use refresh::{AuthConfig, OAuthRefreshClient, RefreshClient, RefreshedToken};
pub use tier::CredentialTier;
pub use vault::{HttpTokenVault, MemoryTokenVault, VaultConfig};
