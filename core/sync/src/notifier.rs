//! User-facing notifications raised by background syncs.

use tracing::warn;

/// Receives conditions the user has to act on.
///
/// Called from background tasks; implementations must not block.
pub trait SyncNotifier: Send + Sync {
    /// The remote or the identity provider rejected the credential.
    ///
    /// Raised once per expiry; the next successful sync re-arms it.
    fn auth_expired(&self, message: &str);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl SyncNotifier for LogNotifier {
    fn auth_expired(&self, message: &str) {
        warn!("Sign-in expired, reconnect to resume backups: {}", message);
    }
}
