//! Common error types for LiftSync.

use thiserror::Error;

/// Top-level error type for LiftSync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Entity absent in the local store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No credential could be obtained for the user.
    #[error("Authentication required")]
    AuthRequired,

    /// The remote rejected the token, or the refresh token itself was rejected.
    ///
    /// Terminal: the user has to go through the consent flow again.
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// Transient network or HTTP failure.
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// No snapshot exists to restore from.
    #[error("No backup available to restore")]
    RestoreDataMissing,

    /// Local storage engine failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the user must (re)authenticate.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::AuthRequired | Error::AuthExpired(_))
    }

    /// Whether retrying later could succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RemoteUnavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
