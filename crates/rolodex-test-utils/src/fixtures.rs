//! Canned contacts

use crate::memory::{InMemoryAggregator, InMemoryRecord, RecordSeed};
use chrono::NaiveDate;
use rolodex_model::{
    ContactId, FieldCategory, FieldValue, ImProtocol, LogicalContact, OnlineAccount,
    PostalAddress, StructuredName,
};
use rolodex_store::{build, Aggregator, RecordSet};
use std::sync::Arc;

/// Primary store; created records land here
pub const LOCAL_STORE: &str = "local";
/// Second writable store
pub const REMOTE_STORE: &str = "remote";
/// Store that accepts no writes
pub const READ_ONLY_STORE: &str = "directory";

/// Aggregator with the local, remote and read-only stores
pub fn aggregator() -> Arc<InMemoryAggregator> {
    Arc::new(
        InMemoryAggregator::new(LOCAL_STORE)
            .with_source(REMOTE_STORE, true)
            .with_source(READ_ONLY_STORE, false),
    )
}

/// Contact of two records:
/// - `a` (local): name "Ann Lee", phone "123"; writes name and phones
/// - `b` (remote): email "a@x.com"; writes emails
pub fn two_record_contact(aggregator: &InMemoryAggregator) -> (ContactId, Vec<Arc<InMemoryRecord>>) {
    let records = aggregator.insert_contact(
        "ann",
        vec![
            RecordSeed::new(LOCAL_STORE)
                .uid("a")
                .writable([FieldCategory::Name, FieldCategory::Phone])
                .with(FieldValue::Name(StructuredName::new("Ann", "Lee")))
                .with(FieldValue::Phone("123".into())),
            RecordSeed::new(REMOTE_STORE)
                .uid("b")
                .writable([FieldCategory::Email])
                .with(FieldValue::Email("a@x.com".into())),
        ],
    );
    (ContactId::new("ann"), records)
}

/// Contact with most categories filled in:
/// - `full` (local): writes everything
/// - `ldap` (read-only): a work phone and an organization email
pub fn rich_contact(aggregator: &InMemoryAggregator) -> (ContactId, Vec<Arc<InMemoryRecord>>) {
    let records = aggregator.insert_contact(
        "bob",
        vec![
            RecordSeed::new(LOCAL_STORE)
                .uid("full")
                .writable(FieldCategory::ALL)
                .with(FieldValue::Name(StructuredName::new("Bob", "Stone")))
                .with(FieldValue::FullName("Bob Stone".into()))
                .with(FieldValue::Nickname("Bobby".into()))
                .with(birthday(1980, 5, 17))
                .with(FieldValue::Favorite(true))
                .with(FieldValue::Note("met at the fair".into()))
                .with_params(FieldValue::Phone("555-0100".into()), &["home", "cell", "pref"])
                .with_params(FieldValue::Phone("555-0101".into()), &["work"])
                .with_params(FieldValue::Email("bob@home.org".into()), &["home"])
                .with_params(FieldValue::Url("https://bob.example".into()), &[])
                .with_params(
                    FieldValue::Address(PostalAddress {
                        street: "1 Main St".into(),
                        locality: "Springfield".into(),
                        country: "US".into(),
                        ..PostalAddress::default()
                    }),
                    &["home", "postal"],
                )
                .with_params(
                    FieldValue::OnlineAccount(OnlineAccount::new(ImProtocol::Jabber, "bob@jabber.org")),
                    &["impp"],
                ),
            RecordSeed::new(READ_ONLY_STORE)
                .uid("ldap")
                .with_params(FieldValue::Phone("555-0199".into()), &["work"])
                .with(FieldValue::Email("bstone@corp.example".into())),
        ],
    );
    (ContactId::new("bob"), records)
}

/// Records of `id` and the contact built from them
pub fn snapshot(aggregator: &InMemoryAggregator, id: &ContactId) -> (RecordSet, LogicalContact) {
    let records = RecordSet::from_records(aggregator.records(id).unwrap_or_default());
    let contact = build(id, &records);
    (records, contact)
}

/// Birthday value; panics on an impossible date
pub fn birthday(year: i32, month: u32, day: u32) -> FieldValue {
    FieldValue::Birthday(NaiveDate::from_ymd_opt(year, month, day).expect("valid date"))
}
