//! Property tests for the tags and read-only flags the builder assigns

use proptest::prelude::*;
use rolodex_model::{provenance, Field, FieldCategory, FieldValue};
use rolodex_store::{CategoryData, SlottedField};
use rolodex_test_utils::{aggregator, snapshot, InMemoryRecord, RecordSeed, LOCAL_STORE};

const CATEGORIES: [FieldCategory; 3] = [FieldCategory::Phone, FieldCategory::Email, FieldCategory::Nickname];

#[derive(Debug, Clone)]
struct SeedShape {
    writable: Vec<FieldCategory>,
    phones: Vec<String>,
    emails: Vec<String>,
    nickname: Option<String>,
}

fn seed_strategy() -> impl Strategy<Value = SeedShape> {
    (
        proptest::sample::subsequence(CATEGORIES.to_vec(), 0..=CATEGORIES.len()),
        proptest::collection::vec("[0-9]{3}", 0..4),
        proptest::collection::vec("[a-z]{1,6}@[a-z]{1,4}\\.org", 0..3),
        proptest::option::of("[A-Z][a-z]{1,6}"),
    )
        .prop_map(|(writable, phones, emails, nickname)| SeedShape {
            writable,
            phones,
            emails,
            nickname,
        })
}

fn seed(shape: &SeedShape) -> RecordSeed {
    let mut seed = RecordSeed::new(LOCAL_STORE).writable(shape.writable.clone());
    for number in &shape.phones {
        seed = seed.with(FieldValue::Phone(number.clone()));
    }
    for address in &shape.emails {
        seed = seed.with(FieldValue::Email(address.clone()));
    }
    if let Some(nickname) = &shape.nickname {
        seed = seed.with(FieldValue::Nickname(nickname.clone()));
    }
    seed
}

fn slotted(record: &InMemoryRecord, category: FieldCategory) -> Vec<SlottedField> {
    match record.stored(category) {
        Some(CategoryData::Single(value)) => value.into_iter().collect(),
        Some(CategoryData::Set(values)) => values,
        Some(CategoryData::Accounts(map)) => map.into_values().flatten().collect(),
        None => Vec::new(),
    }
}

fn holds(record: &InMemoryRecord, slot: u32, field: &Field) -> bool {
    slotted(record, field.category())
        .iter()
        .any(|s| s.slot == slot && s.field.value == field.value)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_built_tags_point_at_their_source(shapes in proptest::collection::vec(seed_strategy(), 1..4)) {
        let aggregator = aggregator();
        let records = aggregator.insert_contact("c", shapes.iter().map(seed).collect());
        let (_, contact) = snapshot(&aggregator, &"c".into());

        let expected: usize = shapes
            .iter()
            .map(|s| s.phones.len() + s.emails.len() + usize::from(s.nickname.is_some()))
            .sum();
        prop_assert_eq!(contact.field_count(), expected);

        for field in contact.iter_fields() {
            let tag = field.tag.as_deref().expect("built fields are tagged");
            let (ordinal, slot) = provenance::parse(tag).expect("built tags parse");
            prop_assert_eq!(provenance::tag(ordinal, slot), tag);
            prop_assert!(provenance::belongs_to(tag, ordinal));

            let record = &records[ordinal];
            prop_assert!(holds(record, slot, field), "{tag} not found on record {ordinal}");
            prop_assert_eq!(field.read_only, !shapes[ordinal].writable.contains(&field.category()));
        }
    }
}
