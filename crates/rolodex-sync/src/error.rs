//! Error types for update sessions
//!
//! Only fatal errors leave a session. Malformed provenance tags are absorbed
//! during planning and the field is treated as unowned.

use rolodex_model::{FieldCategory, ProvenanceError};

/// Update session errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Provenance tag could not be parsed
    #[error(transparent)]
    MalformedTag(#[from] ProvenanceError),

    /// A write was routed to a record that cannot store the category
    #[error("record {record} cannot write {category}")]
    CapabilityMismatch {
        /// Record uid
        record: String,
        /// Category
        category: FieldCategory,
    },

    /// The store refused a write; the message is the store's own
    #[error("{message}")]
    BackendWrite {
        /// Category being written
        category: FieldCategory,
        /// Record uid
        record: String,
        /// Store message
        message: String,
    },

    /// Creating a record for an unowned category failed
    #[error("failed to create record for {category}: {message}")]
    RecordCreation {
        /// Category the record was for
        category: FieldCategory,
        /// Aggregator message
        message: String,
    },

    /// Linking a created record into the contact failed
    #[error("failed to link new record: {message}")]
    Link {
        /// Aggregator message
        message: String,
    },

    /// A write completed against a record that no longer exists
    #[error("failed to update contact")]
    UpdateFailed {
        /// Record uid
        record: String,
    },
}

impl SyncError {
    /// Check if error ends the session
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedTag(_))
    }

    /// Category the error happened in, when there is one
    #[must_use]
    pub fn category(&self) -> Option<FieldCategory> {
        match self {
            Self::CapabilityMismatch { category, .. }
            | Self::BackendWrite { category, .. }
            | Self::RecordCreation { category, .. } => Some(*category),
            Self::MalformedTag(_) | Self::Link { .. } | Self::UpdateFailed { .. } => None,
        }
    }
}
