//! Singleton sync record and the per-user credential cache table.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use liftsync_common::{Result, StoredCredential, SyncMetadata, UserId};

use crate::local::{sqlite_err, LocalStore};

impl LocalStore {
    /// Read the sync record. Defaults when never written.
    pub fn sync_metadata(&self) -> Result<SyncMetadata> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row("SELECT body FROM sync_metadata WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(sqlite_err)?;

        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Ok(SyncMetadata::default()),
        }
    }

    /// Overwrite the sync record.
    pub fn put_sync_metadata(&self, metadata: &SyncMetadata) -> Result<()> {
        let body = serde_json::to_string(metadata)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO sync_metadata (id, body) VALUES (1, ?1)",
            params![body],
        )
        .map_err(sqlite_err)?;
        Ok(())
    }

    pub fn get_credential(&self, user_id: &UserId) -> Result<Option<StoredCredential>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM credentials WHERE user_id = ?1",
                [user_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite_err)?;

        body.map(|b| serde_json::from_str(&b).map_err(Into::into))
            .transpose()
    }

    /// Store a credential, last writer wins.
    ///
    /// If the incoming credential carries no refresh token, the cached one
    /// is kept.
    pub fn put_credential(&self, credential: &StoredCredential) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(sqlite_err)?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT body FROM credentials WHERE user_id = ?1",
                [credential.user_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite_err)?;
        let previous: Option<StoredCredential> = previous
            .map(|b| serde_json::from_str(&b))
            .transpose()?;

        let merged = credential.clone().retain_refresh_token(previous.as_ref());
        let body = serde_json::to_string(&merged)?;
        tx.execute(
            "INSERT OR REPLACE INTO credentials (user_id, body) VALUES (?1, ?2)",
            params![merged.user_id.as_str(), body],
        )
        .map_err(sqlite_err)?;
        tx.commit().map_err(sqlite_err)?;

        debug!("Cached credential for {}", credential.user_id);
        Ok(())
    }

    /// Remove a user's credential. Returns whether one existed.
    pub fn delete_credential(&self, user_id: &UserId) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute(
                "DELETE FROM credentials WHERE user_id = ?1",
                [user_id.as_str()],
            )
            .map_err(sqlite_err)?;
        Ok(removed > 0)
    }
}
