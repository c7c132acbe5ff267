//! Logical contact and preferred-detail map

use crate::category::FieldCategory;
use crate::field::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a logical contact, assigned by the aggregator
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub String);

impl ContactId {
    /// Wrap an aggregator identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContactId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The single preferred value per category
///
/// Values are compared by content. Tags play no part: the preferred phone
/// stays preferred when a rebuild renumbers its record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredDetails {
    by_category: BTreeMap<FieldCategory, Field>,
}

impl PreferredDetails {
    /// Empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `field` preferred for its category, replacing any previous one.
    ///
    /// Returns `false` (and stores nothing) for categories without a
    /// preferred value.
    pub fn set(&mut self, field: Field) -> bool {
        let category = field.category();
        if !category.tracks_preferred() {
            return false;
        }
        self.by_category.insert(category, field);
        true
    }

    /// Preferred value of a category
    #[inline]
    #[must_use]
    pub fn get(&self, category: FieldCategory) -> Option<&Field> {
        self.by_category.get(&category)
    }

    /// Whether `field` has the same content as its category's preferred value
    #[must_use]
    pub fn is_preferred(&self, field: &Field) -> bool {
        self.get(field.category())
            .is_some_and(|preferred| preferred.same_content(field))
    }

    /// Forget the preferred value of a category
    pub fn clear(&mut self, category: FieldCategory) -> Option<Field> {
        self.by_category.remove(&category)
    }

    /// True when no category has a preferred value
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    /// Iterate `(category, preferred)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (FieldCategory, &Field)> {
        self.by_category.iter().map(|(c, f)| (*c, f))
    }
}

/// Externally visible contact assembled from backing records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalContact {
    id: ContactId,
    fields: BTreeMap<FieldCategory, Vec<Field>>,
    #[serde(default)]
    preferred: PreferredDetails,
    /// Record uids in ordinal order
    #[serde(default)]
    record_uids: Vec<String>,
}

impl LogicalContact {
    /// Empty contact
    #[must_use]
    pub fn new(id: ContactId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
            preferred: PreferredDetails::new(),
            record_uids: Vec::new(),
        }
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ContactId {
        &self.id
    }

    /// Fields of one category, in build order
    #[must_use]
    pub fn fields(&self, category: FieldCategory) -> &[Field] {
        self.fields.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Append a field under its category
    pub fn push(&mut self, field: Field) {
        self.fields.entry(field.category()).or_default().push(field);
    }

    /// With a field appended
    #[must_use]
    pub fn with_field(mut self, field: impl Into<Field>) -> Self {
        self.push(field.into());
        self
    }

    /// Replace every field of a category
    pub fn set_fields(&mut self, category: FieldCategory, fields: Vec<Field>) {
        if fields.is_empty() {
            self.fields.remove(&category);
        } else {
            self.fields.insert(category, fields);
        }
    }

    /// Remove a category, returning its fields
    pub fn remove_category(&mut self, category: FieldCategory) -> Vec<Field> {
        self.fields.remove(&category).unwrap_or_default()
    }

    /// Categories with at least one field
    pub fn categories(&self) -> impl Iterator<Item = FieldCategory> + '_ {
        self.fields.keys().copied()
    }

    /// Every field, grouped by category
    pub fn iter_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values().flatten()
    }

    /// Number of fields across all categories
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    /// Preferred-detail map
    #[inline]
    #[must_use]
    pub fn preferred(&self) -> &PreferredDetails {
        &self.preferred
    }

    /// Mutable preferred-detail map
    #[inline]
    pub fn preferred_mut(&mut self) -> &mut PreferredDetails {
        &mut self.preferred
    }

    /// With `field` pushed and marked preferred
    #[must_use]
    pub fn with_preferred(mut self, field: Field) -> Self {
        self.preferred.set(field.clone());
        self.push(field);
        self
    }

    /// Backing record uids, in ordinal order
    #[inline]
    #[must_use]
    pub fn record_uids(&self) -> &[String] {
        &self.record_uids
    }

    /// Set backing record uids
    pub fn set_record_uids(&mut self, uids: Vec<String>) {
        self.record_uids = uids;
    }

    /// Copy restricted to `categories`
    ///
    /// Preferred values follow their category.
    #[must_use]
    pub fn project(&self, categories: &[FieldCategory]) -> Self {
        let mut copy = Self::new(self.id.clone());
        copy.record_uids = self.record_uids.clone();
        for category in categories {
            if let Some(fields) = self.fields.get(category) {
                copy.fields.insert(*category, fields.clone());
            }
            if let Some(preferred) = self.preferred.get(*category) {
                copy.preferred.set(preferred.clone());
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    fn phone(number: &str) -> Field {
        Field::new(FieldValue::Phone(number.into()))
    }

    #[test]
    fn fields_are_grouped_by_category() {
        let contact = LogicalContact::new("c1".into())
            .with_field(phone("1"))
            .with_field(FieldValue::Email("a@x.com".into()))
            .with_field(phone("2"));

        assert_eq!(contact.fields(FieldCategory::Phone).len(), 2);
        assert_eq!(contact.fields(FieldCategory::Email).len(), 1);
        assert!(contact.fields(FieldCategory::Url).is_empty());
        assert_eq!(contact.field_count(), 3);
    }

    #[test]
    fn preferred_is_compared_by_content() {
        let contact = LogicalContact::new("c1".into()).with_preferred(phone("1").with_tag("0.1"));

        assert!(contact.preferred().is_preferred(&phone("1").with_tag("4.4")));
        assert!(!contact.preferred().is_preferred(&phone("2")));
    }

    #[test]
    fn single_valued_categories_have_no_preferred_value() {
        let mut preferred = PreferredDetails::new();
        assert!(!preferred.set(Field::new(FieldValue::Nickname("Bob".into()))));
        assert!(preferred.is_empty());
    }

    #[test]
    fn project_keeps_only_requested_categories() {
        let contact = LogicalContact::new("c1".into())
            .with_preferred(phone("1"))
            .with_field(FieldValue::Email("a@x.com".into()));

        let copy = contact.project(&[FieldCategory::Phone]);
        assert_eq!(copy.fields(FieldCategory::Phone).len(), 1);
        assert!(copy.fields(FieldCategory::Email).is_empty());
        assert!(copy.preferred().get(FieldCategory::Phone).is_some());
    }

    #[test]
    fn setting_no_fields_removes_the_category() {
        let mut contact = LogicalContact::new("c1".into()).with_field(phone("1"));
        contact.set_fields(FieldCategory::Phone, Vec::new());
        assert_eq!(contact.categories().count(), 0);
    }
}
