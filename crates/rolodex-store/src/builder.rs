//! Unified contact builder
//!
//! Walks a contact's records in ordinal order and copies every category of
//! every record onto one [`LogicalContact`]:
//! - each field is tagged `<ordinal>.<slot>`
//! - fields of categories the record cannot write are marked read-only
//! - the record's `pref` parameter feeds the preferred-detail map
//! - account maps are flattened, with protocol-derived qualifiers
//!
//! A record that disappears while being read contributes nothing. That is
//! not an error: the aggregator will report the removal separately.

use crate::capability::{RecordHandle, RecordSet};
use crate::record::{CategoryData, CategorySnapshot, RecordField, StoreError, SINGLE_VALUE_SLOT};
use rolodex_model::vocabulary::{apply_qualifiers, protocol_qualifiers};
use rolodex_model::{provenance, ContactId, Field, FieldCategory, FieldValue, ImProtocol, LogicalContact};

/// Field copied from a record, before it joins the contact
struct Contribution {
    field: Field,
    preferred: bool,
}

/// Build the unified view of `records`
#[must_use]
pub fn build(id: &ContactId, records: &RecordSet) -> LogicalContact {
    let mut contact = LogicalContact::new(id.clone());
    contact.set_record_uids(records.uids());

    for (ordinal, handle) in records.iter() {
        let contributions = match record_contributions(ordinal, handle) {
            Ok(contributions) => contributions,
            Err(StoreError::RecordRemoved(uid)) => {
                tracing::debug!(contact = %id, record = %uid, "record removed during build, skipping");
                continue;
            }
            Err(error) => {
                tracing::warn!(contact = %id, record = handle.uid(), %error, "failed to read record, skipping");
                continue;
            }
        };

        for Contribution { field, preferred } in contributions {
            let category = field.category();
            if preferred && contact.preferred().get(category).is_none() {
                contact.preferred_mut().set(field.clone());
            }
            contact.push(field);
        }
    }

    tracing::debug!(
        contact = %id,
        records = records.len(),
        fields = contact.field_count(),
        "built unified contact"
    );
    contact
}

/// Every field of one record, or the error that made the record unreadable
fn record_contributions(
    ordinal: usize,
    handle: &RecordHandle,
) -> Result<Vec<Contribution>, StoreError> {
    let record = handle.record();
    if record.is_removed() {
        return Err(StoreError::RecordRemoved(record.uid().to_string()));
    }

    let mut contributions = Vec::new();
    for category in FieldCategory::ALL {
        let Some(snapshot) = record.read(category)? else {
            continue;
        };
        let read_only = !handle.is_writable(category);
        for (slot, stored) in flatten(category, snapshot) {
            if stored.value.category() != category || stored.value.is_empty() {
                continue;
            }
            contributions.push(contribution(ordinal, slot, stored, read_only));
        }
    }
    Ok(contributions)
}

/// Slotted values of a snapshot; account values take their protocol from the map key
fn flatten(category: FieldCategory, snapshot: CategorySnapshot) -> Vec<(u32, RecordField)> {
    match snapshot {
        CategoryData::Single(value) => value
            .map(|stored| (SINGLE_VALUE_SLOT, stored.field))
            .into_iter()
            .collect(),
        CategoryData::Set(values) => values.into_iter().map(|s| (s.slot, s.field)).collect(),
        CategoryData::Accounts(map) => {
            let mut flat = Vec::new();
            for (protocol_name, accounts) in map {
                let protocol = ImProtocol::from_name(&protocol_name);
                for mut stored in accounts {
                    if let FieldValue::OnlineAccount(account) = &mut stored.field.value {
                        account.protocol = protocol;
                    } else {
                        tracing::warn!(%category, protocol = %protocol_name, "non-account value in account map");
                        continue;
                    }
                    flat.push((stored.slot, stored.field));
                }
            }
            flat
        }
    }
}

fn contribution(ordinal: usize, slot: u32, stored: RecordField, read_only: bool) -> Contribution {
    let preferred = stored.is_preferred();
    let mut field = Field::new(stored.value).with_tag(provenance::tag(ordinal, slot));
    apply_qualifiers(&mut field, &stored.parameters);

    if let FieldValue::OnlineAccount(account) = &field.value {
        let implied = protocol_qualifiers(account.protocol);
        field.qualifiers.sub_types.extend(implied.sub_types);
    }

    field.read_only = read_only;
    Contribution { field, preferred }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BackingRecord, CategoryUpdate, RecordRef, SlottedField};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rolodex_model::{AccountKind, OnlineAccount, SubType};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Read-only record double with fixed contents
    #[derive(Debug, Default)]
    struct FixedRecord {
        uid: String,
        writable: Vec<FieldCategory>,
        data: BTreeMap<FieldCategory, CategorySnapshot>,
        removed: AtomicBool,
        capability_queries: AtomicUsize,
    }

    impl FixedRecord {
        fn new(uid: &str, writable: &[FieldCategory]) -> Self {
            Self {
                uid: uid.to_string(),
                writable: writable.to_vec(),
                ..Self::default()
            }
        }

        fn with(mut self, category: FieldCategory, data: CategorySnapshot) -> Self {
            self.data.insert(category, data);
            self
        }
    }

    #[async_trait]
    impl BackingRecord for FixedRecord {
        fn uid(&self) -> &str {
            &self.uid
        }

        fn store_id(&self) -> &str {
            "fixed"
        }

        fn writable_categories(&self) -> Vec<FieldCategory> {
            self.capability_queries.fetch_add(1, Ordering::SeqCst);
            self.writable.clone()
        }

        fn read(&self, category: FieldCategory) -> Result<Option<CategorySnapshot>, StoreError> {
            if self.removed.load(Ordering::SeqCst) {
                return Err(StoreError::RecordRemoved(self.uid.clone()));
            }
            Ok(self.data.get(&category).cloned())
        }

        async fn write(&self, _: FieldCategory, _: CategoryUpdate) -> Result<(), StoreError> {
            Err(StoreError::Backend("read-only double".into()))
        }

        fn is_removed(&self) -> bool {
            false
        }
    }

    fn slotted(slot: u32, value: FieldValue, parameters: &[&str]) -> SlottedField {
        SlottedField {
            slot,
            field: RecordField::new(value).with_parameters(parameters.iter().copied()),
        }
    }

    /// Phone snapshot from `(slot, number, "param,param")` triples
    fn phones(values: &[(u32, &str, &str)]) -> CategorySnapshot {
        CategoryData::Set(
            values
                .iter()
                .map(|&(slot, number, params)| {
                    let params: Vec<&str> = params.split(',').filter(|p| !p.is_empty()).collect();
                    slotted(slot, FieldValue::Phone(number.into()), &params)
                })
                .collect(),
        )
    }

    fn set_of(records: Vec<FixedRecord>) -> RecordSet {
        RecordSet::from_records(records.into_iter().map(|r| Arc::new(r) as RecordRef).collect())
    }

    #[test]
    fn fields_are_tagged_with_ordinal_and_slot() {
        let a = FixedRecord::new("a", &[FieldCategory::Phone])
            .with(FieldCategory::Phone, phones(&[(1, "123", ""), (4, "456", "")]));
        let b = FixedRecord::new("b", &[FieldCategory::Email]).with(
            FieldCategory::Email,
            CategoryData::Set(vec![slotted(2, FieldValue::Email("a@x.com".into()), &[])]),
        );

        let contact = build(&"c".into(), &set_of(vec![a, b]));

        let tags: Vec<_> = contact
            .fields(FieldCategory::Phone)
            .iter()
            .map(|f| f.tag.clone().unwrap())
            .collect();
        assert_eq!(tags, vec!["0.1", "0.4"]);
        assert_eq!(
            contact.fields(FieldCategory::Email)[0].tag.as_deref(),
            Some("1.2")
        );
        assert_eq!(contact.record_uids(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn non_writable_categories_are_read_only() {
        let a = FixedRecord::new("a", &[FieldCategory::Email])
            .with(FieldCategory::Phone, phones(&[(1, "123", "")]))
            .with(
                FieldCategory::Nickname,
                CategoryData::Single(Some(slotted(9, FieldValue::Nickname("Bo".into()), &[]))),
            );

        let contact = build(&"c".into(), &set_of(vec![a]));

        assert!(contact.fields(FieldCategory::Phone)[0].read_only);
        let nickname = &contact.fields(FieldCategory::Nickname)[0];
        assert!(nickname.read_only);
        assert_eq!(nickname.tag.as_deref(), Some("0.1"));
    }

    #[test]
    fn preferred_parameter_feeds_preferred_map_first_record_wins() {
        let a = FixedRecord::new("a", &[FieldCategory::Phone])
            .with(FieldCategory::Phone, phones(&[(1, "123", ""), (2, "456", "PREF,cell")]));
        let b = FixedRecord::new("b", &[FieldCategory::Phone])
            .with(FieldCategory::Phone, phones(&[(1, "789", "pref")]));

        let contact = build(&"c".into(), &set_of(vec![a, b]));

        let preferred = contact.preferred().get(FieldCategory::Phone).unwrap();
        assert_eq!(preferred.value, FieldValue::Phone("456".into()));
        assert_eq!(preferred.qualifiers.sub_types.len(), 1);
    }

    #[test]
    fn accounts_are_flattened_with_protocol_qualifiers() {
        let mut map = BTreeMap::new();
        map.insert(
            "jabber".to_string(),
            vec![slotted(
                3,
                FieldValue::OnlineAccount(OnlineAccount::new(ImProtocol::Unknown, "a@j.org")),
                &["home"],
            )],
        );
        map.insert(
            "Skype".to_string(),
            vec![slotted(
                5,
                FieldValue::OnlineAccount(OnlineAccount::new(ImProtocol::Unknown, "echo123")),
                &[],
            )],
        );
        let a = FixedRecord::new("a", &[FieldCategory::OnlineAccount])
            .with(FieldCategory::OnlineAccount, CategoryData::Accounts(map));

        let contact = build(&"c".into(), &set_of(vec![a]));
        let accounts = contact.fields(FieldCategory::OnlineAccount);

        assert_eq!(accounts.len(), 2);
        let FieldValue::OnlineAccount(skype) = &accounts[0].value else {
            panic!("expected account");
        };
        assert_eq!(skype.protocol, ImProtocol::Skype);
        assert_eq!(accounts[0].tag.as_deref(), Some("0.5"));

        let FieldValue::OnlineAccount(jabber) = &accounts[1].value else {
            panic!("expected account");
        };
        assert_eq!(jabber.protocol, ImProtocol::Jabber);
        assert!(accounts[1]
            .qualifiers
            .sub_types
            .contains(&SubType::Account(AccountKind::Impp)));
    }

    #[test]
    fn removed_record_contributes_nothing() {
        let a = FixedRecord::new("a", &[FieldCategory::Phone])
            .with(FieldCategory::Phone, phones(&[(1, "123", "")]));
        let b = FixedRecord::new("b", &[FieldCategory::Phone])
            .with(FieldCategory::Phone, phones(&[(1, "456", "")]));
        b.removed.store(true, Ordering::SeqCst);

        let contact = build(&"c".into(), &set_of(vec![a, b]));

        let phones = contact.fields(FieldCategory::Phone);
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].tag.as_deref(), Some("0.1"));
    }

    #[test]
    fn empty_values_are_skipped() {
        let a = FixedRecord::new("a", &[])
            .with(FieldCategory::Phone, phones(&[(1, "", "")]))
            .with(
                FieldCategory::Favorite,
                CategoryData::Single(Some(slotted(1, FieldValue::Favorite(false), &[]))),
            );

        let contact = build(&"c".into(), &set_of(vec![a]));

        assert!(contact.fields(FieldCategory::Phone).is_empty());
        assert_eq!(contact.fields(FieldCategory::Favorite).len(), 1);
    }

    #[test]
    fn capabilities_are_queried_once_per_record_reference() {
        let record: Arc<FixedRecord> = Arc::new(FixedRecord::new("a", &[FieldCategory::Phone]));
        let as_ref: RecordRef = record.clone();

        let first = RecordSet::from_records(vec![Arc::clone(&as_ref)]);
        let _ = build(&"c".into(), &first);
        let second = first.refresh(vec![Arc::clone(&as_ref)]);
        let _ = build(&"c".into(), &second);

        assert_eq!(record.capability_queries.load(Ordering::SeqCst), 1);
        assert!(second.get(0).unwrap().is_writable(FieldCategory::Phone));
    }
}
