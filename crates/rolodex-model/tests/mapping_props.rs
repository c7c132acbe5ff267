//! Property tests for provenance tags and the qualifier vocabulary

use proptest::prelude::*;
use rolodex_model::provenance::{self, ProvenanceTag};
use rolodex_model::vocabulary::{apply_qualifiers, qualifiers_for};
use rolodex_model::{
    AccountKind, AddressKind, Context, Field, FieldValue, ImProtocol, OnlineAccount, PhoneKind,
    PostalAddress, SubType,
};

fn context_strategy() -> impl Strategy<Value = Context> {
    prop_oneof![Just(Context::Home), Just(Context::Work), Just(Context::Other)]
}

fn phone_kind_strategy() -> impl Strategy<Value = PhoneKind> {
    prop_oneof![
        Just(PhoneKind::Landline),
        Just(PhoneKind::Mobile),
        Just(PhoneKind::Fax),
        Just(PhoneKind::Pager),
        Just(PhoneKind::Voice),
        Just(PhoneKind::Modem),
        Just(PhoneKind::Video),
        Just(PhoneKind::Car),
        Just(PhoneKind::BulletinBoard),
        Just(PhoneKind::Messaging),
        Just(PhoneKind::Assistant),
        Just(PhoneKind::DtmfMenu),
    ]
}

fn address_kind_strategy() -> impl Strategy<Value = AddressKind> {
    prop_oneof![
        Just(AddressKind::Parcel),
        Just(AddressKind::Postal),
        Just(AddressKind::Domestic),
        Just(AddressKind::International),
    ]
}

fn account_kind_strategy() -> impl Strategy<Value = AccountKind> {
    prop_oneof![
        Just(AccountKind::Sip),
        Just(AccountKind::SipVoip),
        Just(AccountKind::Impp),
        Just(AccountKind::VideoShare),
    ]
}

/// Flip the case of every other character
fn scramble_case(text: &str) -> String {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            if i % 2 == 0 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_tag_round_trips(record in 0usize..10_000, slot in 0u32..10_000) {
        let text = provenance::tag(record, slot);
        prop_assert_eq!(provenance::parse(&text), Ok((record, slot)));
        prop_assert!(provenance::belongs_to(&text, record));
        prop_assert_eq!(text.parse::<ProvenanceTag>().map(|t| t.slot()), Ok(slot));
    }

    #[test]
    fn prop_non_numeric_tags_are_rejected(text in "[a-z ]{1,8}(\\.[a-z]{0,3})?") {
        prop_assert!(provenance::parse(&text).is_err());
    }

    #[test]
    fn prop_phone_qualifiers_round_trip(
        contexts in prop::collection::btree_set(context_strategy(), 0..3),
        kinds in prop::collection::btree_set(phone_kind_strategy(), 0..5),
    ) {
        let mut field = Field::new(FieldValue::Phone("555".into()));
        field.qualifiers.contexts = contexts;
        field.qualifiers.sub_types = kinds.into_iter().map(SubType::Phone).collect();

        let mut restored = Field::new(FieldValue::Phone("555".into()));
        apply_qualifiers(&mut restored, qualifiers_for(&field));
        prop_assert_eq!(restored.qualifiers, field.qualifiers);
    }

    #[test]
    fn prop_account_qualifiers_round_trip(
        contexts in prop::collection::btree_set(context_strategy(), 0..3),
        kinds in prop::collection::btree_set(account_kind_strategy(), 0..4),
    ) {
        let value = FieldValue::OnlineAccount(OnlineAccount::new(ImProtocol::Skype, "echo123"));
        let mut field = Field::new(value.clone());
        field.qualifiers.contexts = contexts;
        field.qualifiers.sub_types = kinds.into_iter().map(SubType::Account).collect();

        let mut restored = Field::new(value);
        apply_qualifiers(&mut restored, qualifiers_for(&field));
        prop_assert_eq!(restored.qualifiers, field.qualifiers);
    }

    #[test]
    fn prop_parsing_ignores_case(
        contexts in prop::collection::btree_set(context_strategy(), 0..3),
        kinds in prop::collection::btree_set(phone_kind_strategy(), 0..5),
    ) {
        let mut field = Field::new(FieldValue::Phone("555".into()));
        field.qualifiers.contexts = contexts;
        field.qualifiers.sub_types = kinds.into_iter().map(SubType::Phone).collect();

        let shouted: Vec<String> = qualifiers_for(&field).iter().map(|s| scramble_case(s)).collect();
        let mut restored = Field::new(FieldValue::Phone("555".into()));
        apply_qualifiers(&mut restored, &shouted);
        prop_assert_eq!(restored.qualifiers, field.qualifiers);
    }

    #[test]
    fn prop_addresses_emit_at_most_one_string(
        contexts in prop::collection::btree_set(context_strategy(), 0..3),
        kinds in prop::collection::btree_set(address_kind_strategy(), 0..4),
    ) {
        let mut field = Field::new(FieldValue::Address(PostalAddress::default()));
        field.qualifiers.contexts = contexts;
        field.qualifiers.sub_types = kinds.into_iter().map(SubType::Address).collect();

        let emitted = qualifiers_for(&field);
        prop_assert!(emitted.len() <= 1);
        prop_assert_eq!(emitted.is_empty(), field.qualifiers.is_empty());
    }

    #[test]
    fn prop_emission_is_deterministic(
        contexts in prop::collection::btree_set(context_strategy(), 0..3),
        kinds in prop::collection::btree_set(phone_kind_strategy(), 0..5),
    ) {
        let mut field = Field::new(FieldValue::Phone("555".into()));
        field.qualifiers.contexts = contexts;
        field.qualifiers.sub_types = kinds.into_iter().map(SubType::Phone).collect();
        prop_assert_eq!(qualifiers_for(&field), qualifiers_for(&field.clone()));
    }
}
