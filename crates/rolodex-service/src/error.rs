//! Error types for the contact service

use rolodex_model::ContactId;
use rolodex_sync::SyncError;

/// Errors reported to service callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// No logical contact with this id
    #[error("contact not found: {0}")]
    NotFound(ContactId),

    /// The update session failed; carries the first fatal error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The task running the session ended without a result
    #[error("update session aborted: {0}")]
    SessionAborted(String),
}

impl ServiceError {
    /// Check if the contact does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path given
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Text is not a valid configuration
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
