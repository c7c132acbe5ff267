//! Capability filter
//!
//! Each record reports the categories it accepts writes for. The set is
//! read once when a [`RecordHandle`] is made and reused for as long as the
//! handle points at the same record.

use crate::record::{BackingRecord, RecordRef};
use rolodex_model::FieldCategory;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Categories a record accepts writes for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(BTreeSet<FieldCategory>);

impl Capabilities {
    /// Empty set: nothing writable
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// From categories
    pub fn from_categories(categories: impl IntoIterator<Item = FieldCategory>) -> Self {
        Self(categories.into_iter().collect())
    }

    /// From store property names; unknown names are ignored
    pub fn from_property_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            names
                .into_iter()
                .filter_map(FieldCategory::from_property_name)
                .collect(),
        )
    }

    /// Whether `category` is writable
    #[inline]
    #[must_use]
    pub fn contains(&self, category: FieldCategory) -> bool {
        self.0.contains(&category)
    }

    /// Writable categories
    pub fn iter(&self) -> impl Iterator<Item = FieldCategory> + '_ {
        self.0.iter().copied()
    }

    /// True when nothing is writable
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Query a record's capability set
#[must_use]
pub fn capabilities(record: &dyn BackingRecord) -> Capabilities {
    Capabilities::from_categories(record.writable_categories())
}

/// Record reference with its cached capability set
#[derive(Debug, Clone)]
pub struct RecordHandle {
    record: RecordRef,
    capabilities: Capabilities,
}

impl RecordHandle {
    /// Wrap a record, querying its capabilities once
    #[must_use]
    pub fn new(record: RecordRef) -> Self {
        let capabilities = capabilities(record.as_ref());
        Self {
            record,
            capabilities,
        }
    }

    /// Underlying record
    #[inline]
    #[must_use]
    pub fn record(&self) -> &RecordRef {
        &self.record
    }

    /// Cached capability set
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Whether the record accepts writes for `category`
    #[inline]
    #[must_use]
    pub fn is_writable(&self, category: FieldCategory) -> bool {
        self.capabilities.contains(category)
    }

    /// Record uid
    #[inline]
    #[must_use]
    pub fn uid(&self) -> &str {
        self.record.uid()
    }

    /// Owning store
    #[inline]
    #[must_use]
    pub fn store_id(&self) -> &str {
        self.record.store_id()
    }
}

/// Records of one logical contact, in ordinal order
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    handles: Vec<RecordHandle>,
}

impl RecordSet {
    /// Handles for fresh records
    #[must_use]
    pub fn from_records(records: Vec<RecordRef>) -> Self {
        Self {
            handles: records.into_iter().map(RecordHandle::new).collect(),
        }
    }

    /// New set for `records`, reusing the capability sets of handles that
    /// still point at the same record
    #[must_use]
    pub fn refresh(&self, records: Vec<RecordRef>) -> Self {
        let handles = records
            .into_iter()
            .map(|record| {
                self.handles
                    .iter()
                    .find(|h| Arc::ptr_eq(&h.record, &record))
                    .map_or_else(|| RecordHandle::new(Arc::clone(&record)), Clone::clone)
            })
            .collect();
        Self { handles }
    }

    /// Handle at an ordinal
    #[inline]
    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&RecordHandle> {
        self.handles.get(ordinal)
    }

    /// Handles with their ordinals
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RecordHandle)> {
        self.handles.iter().enumerate()
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True when there are no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Ordinal of the first record owned by `store`
    #[must_use]
    pub fn primary_ordinal(&self, store: &str) -> Option<usize> {
        self.handles.iter().position(|h| h.store_id() == store)
    }

    /// Record references, in ordinal order
    #[must_use]
    pub fn records(&self) -> Vec<RecordRef> {
        self.handles.iter().map(|h| Arc::clone(&h.record)).collect()
    }

    /// Record uids, in ordinal order
    #[must_use]
    pub fn uids(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.uid().to_string()).collect()
    }
}
