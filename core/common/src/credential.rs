//! OAuth credential record shared by every credential tier.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Secret, UserId};

/// Default lead time before expiry at which a token counts as stale.
pub const DEFAULT_BUFFER_WINDOW_SECS: i64 = 5 * 60;

/// A cached OAuth credential for one user.
///
/// The refresh token is issued once per consent grant. Once present it is
/// kept until the user explicitly disconnects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub user_id: UserId,
    pub access_token: Secret,
    #[serde(default)]
    pub refresh_token: Option<Secret>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCredential {
    pub fn new(
        user_id: UserId,
        access_token: impl Into<Secret>,
        refresh_token: Option<Secret>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            updated_at: Utc::now(),
        }
    }

    /// Whether the access token outlives `buffer` from `now`.
    pub fn is_fresh(&self, buffer: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - now > buffer
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Fill in a missing refresh token from an older record.
    pub fn retain_refresh_token(mut self, previous: Option<&StoredCredential>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.and_then(|p| p.refresh_token.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_in: Duration, refresh: Option<&str>) -> StoredCredential {
        StoredCredential::new(
            UserId::new("u1").unwrap(),
            "access",
            refresh.map(Secret::from),
            Utc::now() + expires_in,
        )
    }

    #[test]
    fn test_freshness_respects_buffer() {
        let now = Utc::now();
        let buffer = Duration::seconds(DEFAULT_BUFFER_WINDOW_SECS);
        assert!(credential(Duration::hours(1), None).is_fresh(buffer, now));
        assert!(!credential(Duration::minutes(4), None).is_fresh(buffer, now));
        assert!(!credential(Duration::seconds(-1), None).is_fresh(buffer, now));
    }

    #[test]
    fn test_retain_refresh_token() {
        let old = credential(Duration::hours(-1), Some("refresh-1"));
        let new = credential(Duration::hours(1), None).retain_refresh_token(Some(&old));
        assert_eq!(new.refresh_token, Some(Secret::from("refresh-1")));

        let rotated = credential(Duration::hours(1), Some("refresh-2")).retain_refresh_token(Some(&old));
        assert_eq!(rotated.refresh_token, Some(Secret::from("refresh-2")));
    }

    #[test]
    fn test_credential_serialization() {
        let cred = credential(Duration::hours(1), Some("refresh"));
        let json = serde_json::to_string(&cred).unwrap();
        let restored: StoredCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cred);
        assert!(json.contains("\"refreshToken\""));
    }
}
