//! Aggregator interface
//!
//! The aggregator decides which records belong to which logical contact,
//! creates records in its stores and links records together. This crate only
//! consumes it.

use crate::record::{CategoryUpdate, RecordRef};
use async_trait::async_trait;
use rolodex_model::{ContactId, FieldCategory};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A store known to the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Store identifier
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    /// Whether records can be created in the store
    pub writable: bool,
    /// Whether this is the primary store
    pub is_primary: bool,
}

/// Change reported by the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregatorEvent {
    /// A logical contact appeared
    ContactAdded(ContactId),
    /// A logical contact disappeared
    ContactRemoved(ContactId),
    /// A record of the contact changed, or its record list did
    RecordsChanged(ContactId),
}

impl AggregatorEvent {
    /// Contact the event is about
    #[inline]
    #[must_use]
    pub fn contact(&self) -> &ContactId {
        match self {
            Self::ContactAdded(id) | Self::ContactRemoved(id) | Self::RecordsChanged(id) => id,
        }
    }
}

/// Identity resolution and record lifecycle
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Every known logical contact
    fn contact_ids(&self) -> Vec<ContactId>;

    /// Records of a contact, in the aggregator's order
    ///
    /// `None` when the contact is unknown.
    fn records(&self, contact: &ContactId) -> Option<Vec<RecordRef>>;

    /// Store that new records go to
    fn primary_store(&self) -> Option<String>;

    /// Known stores
    fn sources(&self) -> Vec<SourceInfo>;

    /// Create a record in `store` holding `initial`
    ///
    /// # Errors
    /// - `AggregatorError::StoreNotFound` for an unknown store
    /// - `AggregatorError::Creation` when the store refuses
    async fn create_record(
        &self,
        store: &str,
        initial: Vec<(FieldCategory, CategoryUpdate)>,
    ) -> Result<RecordRef, AggregatorError>;

    /// Merge `records` into one logical contact
    ///
    /// Returns the contact that now holds all of them.
    ///
    /// # Errors
    /// - `AggregatorError::Link` when linking fails
    async fn link(&self, records: Vec<RecordRef>) -> Result<ContactId, AggregatorError>;

    /// Push buffered changes of `store` to its backend
    ///
    /// Aggregators that write through need nothing here.
    ///
    /// # Errors
    /// - `AggregatorError::StoreNotFound` for an unknown store
    async fn flush(&self, _store: &str) -> Result<(), AggregatorError> {
        Ok(())
    }

    /// Stream of change events
    fn subscribe(&self) -> broadcast::Receiver<AggregatorEvent>;
}

/// Aggregator errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregatorError {
    /// Store does not exist
    #[error("store not found: {0}")]
    StoreNotFound(String),

    /// Contact does not exist
    #[error("contact not found: {0}")]
    ContactNotFound(ContactId),

    /// Record creation refused
    #[error("{0}")]
    Creation(String),

    /// Linking refused
    #[error("{0}")]
    Link(String),
}
