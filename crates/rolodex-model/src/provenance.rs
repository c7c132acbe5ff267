//! Field provenance tags
//!
//! A tag `"<record>.<slot>"` ties a field on the unified contact to the
//! backing record that produced it (its ordinal in the contact's record
//! list) and to the slot the value occupies inside that record.
//!
//! Tags are recomputed on every build. Record ordinals only hold within one
//! build cycle, so a tag must be resolved against the record list it was
//! produced from.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Parsed provenance tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProvenanceTag {
    record: usize,
    slot: u32,
}

impl ProvenanceTag {
    /// Create tag for a record ordinal and slot ordinal
    #[inline]
    #[must_use]
    pub const fn new(record: usize, slot: u32) -> Self {
        Self { record, slot }
    }

    /// Ordinal of the owning record
    #[inline]
    #[must_use]
    pub const fn record(&self) -> usize {
        self.record
    }

    /// Slot within the owning record
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }
}

impl Display for ProvenanceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.record, self.slot)
    }
}

impl FromStr for ProvenanceTag {
    type Err = ProvenanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProvenanceError::Malformed(s.to_string());

        let (record, slot) = s.split_once('.').ok_or_else(malformed)?;
        if !is_ordinal(record) || !is_ordinal(slot) {
            return Err(malformed());
        }

        Ok(Self {
            record: record.parse().map_err(|_| malformed())?,
            slot: slot.parse().map_err(|_| malformed())?,
        })
    }
}

/// Plain ASCII digits only: no sign, no whitespace
fn is_ordinal(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// Tag text for a record ordinal and slot ordinal
#[inline]
#[must_use]
pub fn tag(record: usize, slot: u32) -> String {
    ProvenanceTag::new(record, slot).to_string()
}

/// Split a tag into `(record, slot)`
///
/// # Errors
/// - `ProvenanceError::Malformed` unless the text is exactly two
///   non-negative integers joined by a dot
pub fn parse(tag: &str) -> Result<(usize, u32), ProvenanceError> {
    let parsed: ProvenanceTag = tag.parse()?;
    Ok((parsed.record, parsed.slot))
}

/// Whether `tag` was produced by the record at `record`
///
/// Malformed tags belong to no record.
#[must_use]
pub fn belongs_to(tag: &str, record: usize) -> bool {
    parse(tag).is_ok_and(|(owner, _)| owner == record)
}

/// Provenance errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvenanceError {
    /// Tag is not `<record>.<slot>`
    #[error("malformed provenance tag: {0:?}")]
    Malformed(String),
}
