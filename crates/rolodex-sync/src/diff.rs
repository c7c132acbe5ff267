//! Per-category diff
//!
//! Planning is synchronous and side-effect free: it decides, for one
//! category, which records need a write, or whether the category moves to a
//! new record because some desired field has no record able to hold it.
//! The session then carries the plan out one awaited call at a time.

use rolodex_model::{Field, FieldCategory, FieldValue, LogicalContact};
use rolodex_store::RecordSet;
use std::collections::BTreeMap;

/// Desired value set for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    /// Record ordinal
    pub ordinal: usize,
    /// Fields the record should hold afterwards
    pub fields: Vec<Field>,
}

/// What one category needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPlan {
    /// Records whose desired and current sets differ, in ordinal order
    pub writes: Vec<RecordWrite>,
    /// Fields for a new record. Non-empty when some desired field has no
    /// record able to take it; the new record then gets the category's whole
    /// desired set and `writes` stays empty.
    pub created: Vec<Field>,
    /// Writable records whose current set this plan accounts for
    pub settled: Vec<usize>,
}

impl CategoryPlan {
    /// True when the category needs no backend call
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.writes.is_empty() && self.created.is_empty()
    }
}

/// Inputs shared by every category of one session
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    /// Contact the client wants
    pub desired: &'a LogicalContact,
    /// Contact as last built
    pub current: &'a LogicalContact,
    /// Records the current contact was built from
    pub records: &'a RecordSet,
    /// Ordinal of the record untagged fields go to
    pub primary: Option<usize>,
}

impl DiffContext<'_> {
    /// Plan one category
    #[must_use]
    pub fn plan(&self, category: FieldCategory) -> CategoryPlan {
        let current = current_by_record(self.current, category);
        let mut routed: BTreeMap<usize, Vec<Field>> = BTreeMap::new();
        let mut carried = Vec::new();
        let mut orphans = 0;
        let mut plan = CategoryPlan::default();

        for field in self.desired_fields(category) {
            let target = self.resolve_target(&field);
            match target.and_then(|ordinal| self.records.get(ordinal).map(|h| (ordinal, h))) {
                Some((ordinal, handle)) if handle.is_writable(category) => {
                    carried.push(field.clone());
                    routed.entry(ordinal).or_default().push(field);
                }
                _ if self.is_unchanged_read_only(category, &field) => {
                    tracing::trace!(%category, "leaving read-only field untouched");
                }
                _ => {
                    orphans += 1;
                    carried.push(field);
                }
            }
        }

        for kept in self.current.fields(category).iter().filter(|f| f.read_only) {
            if !self.desired.fields(category).iter().any(|f| f.same_content(kept)) {
                tracing::debug!(%category, tag = ?kept.tag, "cannot remove field from read-only record");
            }
        }

        if orphans > 0 {
            tracing::debug!(%category, orphans, fields = carried.len(), "category moves to a new record");
            plan.settled = current.into_keys().collect();
            plan.created = carried;
            return plan;
        }

        let desired_preferred = self.desired.preferred().get(category);
        let current_preferred = self.current.preferred().get(category);
        for (ordinal, desired) in routed {
            let existing = current.get(&ordinal).map_or(&[][..], Vec::as_slice);
            plan.settled.push(ordinal);
            if same_field_set(desired.as_slice(), existing, desired_preferred, current_preferred) {
                tracing::trace!(%category, ordinal, "unchanged");
            } else {
                plan.writes.push(RecordWrite {
                    ordinal,
                    fields: desired,
                });
            }
        }
        plan
    }

    /// Non-empty desired fields of a category.
    ///
    /// A contact without a favorite field means "not a favorite": every
    /// writable record currently holding the flag is asked for `false`.
    fn desired_fields(&self, category: FieldCategory) -> Vec<Field> {
        let desired: Vec<Field> = self
            .desired
            .fields(category)
            .iter()
            .filter(|f| !f.value.is_empty())
            .cloned()
            .collect();

        if category != FieldCategory::Favorite || !desired.is_empty() {
            return desired;
        }

        self.current
            .fields(FieldCategory::Favorite)
            .iter()
            .filter(|f| {
                owning_ordinal(f)
                    .and_then(|o| self.records.get(o))
                    .is_some_and(|h| h.is_writable(category))
            })
            .filter_map(|f| f.tag.clone())
            .map(|tag| Field::new(FieldValue::Favorite(false)).with_tag(tag))
            .collect()
    }

    /// Owning record of a desired field: its tag, else the primary record
    fn resolve_target(&self, field: &Field) -> Option<usize> {
        match field.provenance() {
            Some(Ok(tag)) => Some(tag.record()),
            Some(Err(error)) => {
                tracing::warn!(%error, "treating field as unassigned");
                self.primary
            }
            None => self.primary,
        }
    }

    /// Field already on the contact from a record that cannot change it
    fn is_unchanged_read_only(&self, category: FieldCategory, field: &Field) -> bool {
        self.current
            .fields(category)
            .iter()
            .any(|existing| existing.read_only && existing.same_content(field))
    }
}

/// Ordinal a field's tag names, if the tag parses
#[must_use]
pub fn owning_ordinal(field: &Field) -> Option<usize> {
    field.provenance().and_then(Result::ok).map(|tag| tag.record())
}

/// Current fields of a category grouped by owning record
#[must_use]
pub fn current_by_record(
    contact: &LogicalContact,
    category: FieldCategory,
) -> BTreeMap<usize, Vec<Field>> {
    let mut grouped: BTreeMap<usize, Vec<Field>> = BTreeMap::new();
    for field in contact.fields(category) {
        if let Some(ordinal) = owning_ordinal(field) {
            grouped.entry(ordinal).or_default().push(field.clone());
        }
    }
    grouped
}

/// Structural equality of two field sets, order ignored, plus parity of the
/// preferred value within each set
#[must_use]
pub fn same_field_set(
    desired: &[Field],
    current: &[Field],
    desired_preferred: Option<&Field>,
    current_preferred: Option<&Field>,
) -> bool {
    if desired.len() != current.len() {
        return false;
    }

    let mut left: Vec<_> = desired.iter().map(Field::content_key).collect();
    let mut right: Vec<_> = current.iter().map(Field::content_key).collect();
    left.sort();
    right.sort();
    if left != right {
        return false;
    }

    match (
        preferred_within(desired, desired_preferred),
        preferred_within(current, current_preferred),
    ) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_content(b),
        _ => false,
    }
}

fn preferred_within<'a>(set: &[Field], preferred: Option<&'a Field>) -> Option<&'a Field> {
    preferred.filter(|p| set.iter().any(|f| f.same_content(p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(number: &str) -> Field {
        Field::new(FieldValue::Phone(number.into()))
    }

    #[test]
    fn order_is_irrelevant() {
        let a = [phone("1").with_tag("0.1"), phone("2").with_tag("0.2")];
        let b = [phone("2"), phone("1")];
        assert!(same_field_set(&a, &b, None, None));
    }

    #[test]
    fn multiplicity_matters() {
        let a = [phone("1"), phone("1")];
        let b = [phone("1"), phone("2")];
        assert!(!same_field_set(&a, &b, None, None));
        assert!(!same_field_set(&a[..1], &a, None, None));
    }

    #[test]
    fn preferred_parity_is_compared() {
        let set = [phone("1"), phone("2")];
        let one = phone("1");
        let two = phone("2");

        assert!(same_field_set(&set, &set, Some(&one), Some(&one)));
        assert!(!same_field_set(&set, &set, Some(&one), None));
        assert!(!same_field_set(&set, &set, Some(&one), Some(&two)));
    }

    #[test]
    fn preferred_outside_the_set_is_ignored() {
        let set = [phone("1")];
        let elsewhere = phone("9");
        assert!(same_field_set(&set, &set, Some(&elsewhere), None));
    }

    #[test]
    fn current_fields_group_by_tag() {
        let contact = LogicalContact::new("c".into())
            .with_field(phone("1").with_tag("0.1"))
            .with_field(phone("2").with_tag("1.1"))
            .with_field(phone("3").with_tag("0.2"))
            .with_field(phone("4").with_tag("bogus"));
        let grouped = current_by_record(&contact, FieldCategory::Phone);
        assert_eq!(grouped[&0].len(), 2);
        assert_eq!(grouped[&1].len(), 1);
        assert_eq!(grouped.len(), 2);
    }
}
