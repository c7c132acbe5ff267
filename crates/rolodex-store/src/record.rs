//! Backing record interface
//!
//! A backing record is one store's copy of a person. Getters are
//! synchronous reads of already-resident state; setters are asynchronous
//! and complete once the store has accepted (or refused) the change.

use async_trait::async_trait;
use rolodex_model::vocabulary::{self, PREFERRED_PARAMETER};
use rolodex_model::{Cardinality, Field, FieldCategory, FieldValue, ImProtocol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Slot reported for single-valued categories
pub const SINGLE_VALUE_SLOT: u32 = 1;

/// Shared handle to a backing record
pub type RecordRef = Arc<dyn BackingRecord>;

/// A value as a record stores it: the value plus free-form parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordField {
    /// Value
    pub value: FieldValue,
    /// Type parameters, including the preferred marker
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl RecordField {
    /// Value without parameters
    #[inline]
    #[must_use]
    pub fn new(value: FieldValue) -> Self {
        Self {
            value,
            parameters: Vec::new(),
        }
    }

    /// With parameters
    #[must_use]
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.extend(parameters.into_iter().map(Into::into));
        self
    }

    /// Record form of a contact field
    ///
    /// Qualifiers become parameters; `preferred` adds the preferred marker.
    #[must_use]
    pub fn from_field(field: &Field, preferred: bool) -> Self {
        let mut parameters = vocabulary::qualifiers_for(field);
        if preferred {
            parameters.push(PREFERRED_PARAMETER.to_string());
        }
        Self {
            value: field.value.clone(),
            parameters,
        }
    }

    /// Whether the preferred marker is present
    #[must_use]
    pub fn is_preferred(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| vocabulary::is_preferred_parameter(p))
    }
}

/// A stored value and the slot it occupies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlottedField {
    /// Slot ordinal, assigned by the record
    pub slot: u32,
    /// Stored value
    pub field: RecordField,
}

/// Values of one category on one record, in the shape the category uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryData<F> {
    /// Single-valued categories
    Single(Option<F>),
    /// Multi-valued categories
    Set(Vec<F>),
    /// Online accounts, keyed by protocol name
    Accounts(BTreeMap<String, Vec<F>>),
}

/// What a record reports for a category
pub type CategorySnapshot = CategoryData<SlottedField>;

/// What a record is asked to store for a category
pub type CategoryUpdate = CategoryData<RecordField>;

impl<F> CategoryData<F> {
    /// Empty value in the shape `category` uses
    #[must_use]
    pub fn empty_for(category: FieldCategory) -> Self {
        match (category, category.cardinality()) {
            (FieldCategory::OnlineAccount, _) => Self::Accounts(BTreeMap::new()),
            (_, Cardinality::Single) => Self::Single(None),
            (_, Cardinality::Multiple) => Self::Set(Vec::new()),
        }
    }

    /// True when no value is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.is_none(),
            Self::Set(values) => values.is_empty(),
            Self::Accounts(map) => map.values().all(Vec::is_empty),
        }
    }

    /// Number of values held
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(value) => usize::from(value.is_some()),
            Self::Set(values) => values.len(),
            Self::Accounts(map) => map.values().map(Vec::len).sum(),
        }
    }
}

impl CategoryUpdate {
    /// Record value for `category` built from contact fields
    ///
    /// Single-valued categories keep the first field. Accounts with an
    /// unknown protocol have no key to be stored under and are dropped.
    #[must_use]
    pub fn from_fields(category: FieldCategory, fields: &[Field], preferred: Option<&Field>) -> Self {
        let to_record = |field: &Field| {
            let is_preferred = preferred.is_some_and(|p| p.same_content(field));
            RecordField::from_field(field, is_preferred)
        };
        let matching = fields.iter().filter(|f| f.category() == category);

        match Self::empty_for(category) {
            Self::Single(_) => Self::Single(matching.map(to_record).next()),
            Self::Set(_) => Self::Set(matching.map(to_record).collect()),
            Self::Accounts(mut map) => {
                for field in matching {
                    let FieldValue::OnlineAccount(account) = &field.value else {
                        continue;
                    };
                    if account.protocol == ImProtocol::Unknown {
                        tracing::debug!(address = %account.address, "skipping account with unknown protocol");
                        continue;
                    }
                    map.entry(account.protocol.as_str().to_string())
                        .or_insert_with(Vec::new)
                        .push(to_record(field));
                }
                Self::Accounts(map)
            }
        }
    }
}

/// A store's record contributing to a logical contact
#[async_trait]
pub trait BackingRecord: Send + Sync + fmt::Debug {
    /// Stable record identifier
    fn uid(&self) -> &str;

    /// Identifier of the owning store
    fn store_id(&self) -> &str;

    /// Categories this record accepts writes for
    fn writable_categories(&self) -> Vec<FieldCategory>;

    /// Current values of a category
    ///
    /// `Ok(None)` when the record does not carry the category at all.
    ///
    /// # Errors
    /// - `StoreError::RecordRemoved` if the record was deleted
    fn read(&self, category: FieldCategory) -> Result<Option<CategorySnapshot>, StoreError>;

    /// Replace the values of a category
    ///
    /// # Errors
    /// - `StoreError::Backend` with the store's message when it refuses
    /// - `StoreError::RecordRemoved` if the record was deleted
    async fn write(&self, category: FieldCategory, update: CategoryUpdate) -> Result<(), StoreError>;

    /// Whether the store has deleted this record
    fn is_removed(&self) -> bool;
}

/// Errors reported by a backing record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record no longer exists
    #[error("record {0} was removed")]
    RecordRemoved(String),

    /// Store refused the operation; message is the store's own
    #[error("{0}")]
    Backend(String),

    /// Record has no storage for the category
    #[error("record {record} does not support {category}")]
    Unsupported {
        /// Record uid
        record: String,
        /// Category
        category: FieldCategory,
    },
}

impl StoreError {
    /// Check if the record is gone
    #[inline]
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::RecordRemoved(_))
    }
}
