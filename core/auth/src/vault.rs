//! Server-side token vault.
//!
//! The vault survives device changes and storage eviction, so it is the
//! source of truth whenever the local cache has nothing for a user.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use liftsync_common::{Error, Result, StoredCredential, UserId};

use crate::tier::CredentialTier;

/// Configuration for the HTTP token vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Base URL of the vault service. `None` disables the vault tier.
    pub base_url: Option<String>,
}

/// Token vault reached over HTTP.
///
/// - `GET    {base}/credentials/{user}` returns the credential or 404
/// - `PUT    {base}/credentials/{user}` stores it
/// - `DELETE {base}/credentials/{user}` removes it
pub struct HttpTokenVault {
    http: Client,
    base_url: Url,
}

impl HttpTokenVault {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidInput(format!("Invalid vault URL: {}", e)))?;
        let http = Client::builder()
            .user_agent("LiftSync/0.1")
            .build()
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// Build from configuration, if a vault is configured.
    pub fn from_config(config: &VaultConfig) -> Result<Option<Self>> {
        config.base_url.as_deref().map(Self::new).transpose()
    }

    fn credential_url(&self, user_id: &UserId) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidInput("Vault URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("credentials")
            .push(user_id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl CredentialTier for HttpTokenVault {
    fn name(&self) -> &str {
        "vault"
    }

    async fn read(&self, user_id: &UserId) -> Result<Option<StoredCredential>> {
        let response = self
            .http
            .get(self.credential_url(user_id)?)
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Vault read failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let credential = response.json().await.map_err(|e| {
                    Error::Serialization(format!("Invalid vault response: {}", e))
                })?;
                Ok(Some(credential))
            }
            status => Err(Error::RemoteUnavailable(format!("Vault read: {}", status))),
        }
    }

    async fn write(&self, credential: &StoredCredential) -> Result<()> {
        let response = self
            .http
            .put(self.credential_url(&credential.user_id)?)
            .header(header::CONTENT_TYPE, "application/json")
            .json(credential)
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Vault write failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::RemoteUnavailable(format!(
                "Vault write: {}",
                response.status()
            )));
        }
        debug!("Mirrored credential for {} into vault", credential.user_id);
        Ok(())
    }

    async fn remove(&self, user_id: &UserId) -> Result<()> {
        let response = self
            .http
            .delete(self.credential_url(user_id)?)
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Vault delete failed: {}", e)))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Error::RemoteUnavailable(format!("Vault delete: {}", status)))
        }
    }
}

/// In-memory vault for testing and offline development.
#[derive(Default)]
pub struct MemoryTokenVault {
    entries: RwLock<HashMap<UserId, StoredCredential>>,
}

impl MemoryTokenVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialTier for MemoryTokenVault {
    fn name(&self) -> &str {
        "memory-vault"
    }

    async fn read(&self, user_id: &UserId) -> Result<Option<StoredCredential>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Storage("Vault lock poisoned".to_string()))?;
        Ok(entries.get(user_id).cloned())
    }

    async fn write(&self, credential: &StoredCredential) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("Vault lock poisoned".to_string()))?;
        let merged = credential
            .clone()
            .retain_refresh_token(entries.get(&credential.user_id));
        entries.insert(merged.user_id.clone(), merged);
        Ok(())
    }

    async fn remove(&self, user_id: &UserId) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("Vault lock poisoned".to_string()))?;
        entries.remove(user_id);
        Ok(())
    }
}
