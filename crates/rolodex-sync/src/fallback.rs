//! Backing-record creation fallback
//!
//! Used when a desired category has fields that no linked record can hold.
//! A new record carrying only that category is created in the primary
//! store and linked into the same logical contact.

use crate::error::SyncError;
use rolodex_model::{ContactId, Field, FieldCategory};
use rolodex_store::{Aggregator, CategoryUpdate, RecordRef};

/// A created record and the contact the link put it in
#[derive(Debug, Clone)]
pub struct LinkedRecord {
    /// New record
    pub record: RecordRef,
    /// Contact holding the existing records and the new one
    pub contact: ContactId,
}

/// Creates records in one store and links them to existing records
pub struct CreationFallback<'a> {
    aggregator: &'a dyn Aggregator,
    store: &'a str,
}

impl<'a> CreationFallback<'a> {
    /// Fallback against `store`
    #[inline]
    #[must_use]
    pub fn new(aggregator: &'a dyn Aggregator, store: &'a str) -> Self {
        Self { aggregator, store }
    }

    /// Create a record holding `fields` of `category`, then link it with
    /// `existing`
    ///
    /// The aggregator may answer the link with a different contact id than
    /// the records had; the returned [`LinkedRecord`] carries the new one.
    ///
    /// # Errors
    /// - `SyncError::RecordCreation` if the aggregator refuses the record
    /// - `SyncError::Link` if the new record cannot be linked
    pub async fn create_record_for(
        &self,
        existing: Vec<RecordRef>,
        category: FieldCategory,
        fields: &[Field],
        preferred: Option<&Field>,
    ) -> Result<LinkedRecord, SyncError> {
        let update = CategoryUpdate::from_fields(category, fields, preferred);
        tracing::info!(%category, store = self.store, values = update.len(), "creating record for unowned category");

        let record = self
            .aggregator
            .create_record(self.store, vec![(category, update)])
            .await
            .map_err(|e| SyncError::RecordCreation {
                category,
                message: e.to_string(),
            })?;

        let mut members = existing;
        members.push(RecordRef::clone(&record));
        let contact = self
            .aggregator
            .link(members)
            .await
            .map_err(|e| SyncError::Link {
                message: e.to_string(),
            })?;

        tracing::debug!(%category, record = record.uid(), %contact, "linked new record");
        Ok(LinkedRecord { record, contact })
    }
}
