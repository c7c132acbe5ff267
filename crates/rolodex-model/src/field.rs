//! Fields of a logical contact

use crate::category::FieldCategory;
use crate::provenance::{ProvenanceError, ProvenanceTag};
use crate::qualifier::{Context, Qualifiers, SubType};
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};

/// One value on a logical contact, with qualifiers and provenance
///
/// Equality of content ([`Field::same_content`]) ignores the tag and the
/// read-only marker: those describe where a value lives, not what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Value
    pub value: FieldValue,
    /// Contexts and sub-types
    #[serde(default)]
    pub qualifiers: Qualifiers,
    /// Provenance tag text; `None` when no backing record owns the value yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Set when the owning record cannot write this category
    #[serde(default)]
    pub read_only: bool,
}

impl Field {
    /// Untagged field without qualifiers
    #[inline]
    #[must_use]
    pub fn new(value: FieldValue) -> Self {
        Self {
            value,
            qualifiers: Qualifiers::default(),
            tag: None,
            read_only: false,
        }
    }

    /// With provenance tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// With qualifiers
    #[inline]
    #[must_use]
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// With a context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.qualifiers.contexts.insert(context);
        self
    }

    /// With a sub-type
    #[inline]
    #[must_use]
    pub fn with_sub_type(mut self, sub_type: SubType) -> Self {
        self.qualifiers.sub_types.insert(sub_type);
        self
    }

    /// Mark read-only
    #[inline]
    #[must_use]
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Category of the value
    #[inline]
    #[must_use]
    pub fn category(&self) -> FieldCategory {
        self.value.category()
    }

    /// Parsed provenance, if tagged
    ///
    /// `None` for untagged fields, `Some(Err(_))` for malformed tags.
    #[must_use]
    pub fn provenance(&self) -> Option<Result<ProvenanceTag, ProvenanceError>> {
        self.tag.as_deref().map(str::parse)
    }

    /// Same value and qualifiers
    #[inline]
    #[must_use]
    pub fn same_content(&self, other: &Field) -> bool {
        self.value == other.value && self.qualifiers == other.qualifiers
    }

    /// Ordering key over content only
    #[inline]
    #[must_use]
    pub fn content_key(&self) -> (&FieldValue, &Qualifiers) {
        (&self.value, &self.qualifiers)
    }
}

impl From<FieldValue> for Field {
    fn from(value: FieldValue) -> Self {
        Self::new(value)
    }
}
