//! Qualifier vocabulary mapper
//!
//! Converts between the enumerated [`Qualifiers`] of a field and the
//! free-form parameter strings a backing record stores. Parsing is
//! case-insensitive; emission always uses the canonical lowercase spelling.
//!
//! Postal addresses emit at most one string. Stores have been seen to stall
//! on multi-valued address types, so an address with several qualifiers does
//! not survive a round trip intact.

use crate::category::FieldCategory;
use crate::field::Field;
use crate::qualifier::{AccountKind, Context, Qualifiers, SubType};
use crate::value::ImProtocol;

/// Record parameter marking a value as preferred
pub const PREFERRED_PARAMETER: &str = "pref";

/// Parameter strings for a field's qualifiers
///
/// Contexts come first, then sub-types, each in enumeration order and
/// without duplicates. Sub-types that do not apply to the field's category
/// are dropped.
#[must_use]
pub fn qualifiers_for(field: &Field) -> Vec<String> {
    let category = field.category();

    let contexts = field.qualifiers.contexts.iter().map(|c| c.as_str());
    let sub_types = field
        .qualifiers
        .sub_types
        .iter()
        .filter(|s| s.applies_to(category))
        .map(|s| s.as_str());

    let mut parameters: Vec<String> = Vec::new();
    for name in contexts.chain(sub_types) {
        if !parameters.iter().any(|p| p == name) {
            parameters.push(name.to_string());
        }
    }

    if category == FieldCategory::Address {
        parameters.truncate(1);
    }
    parameters
}

/// Replace a field's qualifiers with those parsed from `parameters`
///
/// Strings outside the field category's vocabulary are ignored, including
/// [`PREFERRED_PARAMETER`].
pub fn apply_qualifiers<I, S>(field: &mut Field, parameters: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let category = field.category();
    let mut qualifiers = Qualifiers::default();

    for parameter in parameters {
        let parameter = parameter.as_ref().trim();
        if let Some(context) = Context::parse(parameter) {
            qualifiers.contexts.insert(context);
        } else if let Some(sub_type) = SubType::parse_for(category, parameter) {
            qualifiers.sub_types.insert(sub_type);
        }
    }

    field.qualifiers = qualifiers;
}

/// Whether a parameter string is the preferred marker
#[inline]
#[must_use]
pub fn is_preferred_parameter(parameter: &str) -> bool {
    parameter.trim().eq_ignore_ascii_case(PREFERRED_PARAMETER)
}

/// Qualifiers implied by an account's protocol
#[must_use]
pub fn protocol_qualifiers(protocol: ImProtocol) -> Qualifiers {
    match protocol {
        ImProtocol::Jabber => Qualifiers::new().with_sub_type(SubType::Account(AccountKind::Impp)),
        _ => Qualifiers::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::{AddressKind, PhoneKind};
    use crate::value::{FieldValue, PostalAddress};

    fn phone() -> Field {
        Field::new(FieldValue::Phone("555".into()))
    }

    #[test]
    fn contexts_precede_sub_types() {
        let field = phone()
            .with_sub_type(SubType::Phone(PhoneKind::Fax))
            .with_context(Context::Work);
        assert_eq!(qualifiers_for(&field), vec!["work", "fax"]);
    }

    #[test]
    fn apply_is_case_insensitive() {
        let mut field = phone();
        apply_qualifiers(&mut field, ["HOME", "Mobile", "pref"]);
        assert!(field.qualifiers.contexts.contains(&Context::Home));
        assert!(field
            .qualifiers
            .sub_types
            .contains(&SubType::Phone(PhoneKind::Mobile)));
        assert_eq!(field.qualifiers.contexts.len() + field.qualifiers.sub_types.len(), 2);
    }

    #[test]
    fn foreign_sub_types_are_ignored() {
        let mut field = Field::new(FieldValue::Email("a@x.com".into()));
        apply_qualifiers(&mut field, ["fax", "parcel", "work"]);
        assert!(field.qualifiers.sub_types.is_empty());
        assert_eq!(qualifiers_for(&field), vec!["work"]);
    }

    #[test]
    fn addresses_emit_a_single_qualifier() {
        let field = Field::new(FieldValue::Address(PostalAddress::default()))
            .with_context(Context::Home)
            .with_sub_type(SubType::Address(AddressKind::Parcel))
            .with_sub_type(SubType::Address(AddressKind::International));
        assert_eq!(qualifiers_for(&field), vec!["home"]);
    }

    #[test]
    fn applying_emitted_strings_restores_qualifiers() {
        let field = phone()
            .with_context(Context::Home)
            .with_context(Context::Other)
            .with_sub_type(SubType::Phone(PhoneKind::Mobile))
            .with_sub_type(SubType::Phone(PhoneKind::Video));
        let mut restored = phone();
        apply_qualifiers(&mut restored, qualifiers_for(&field));
        assert_eq!(restored.qualifiers, field.qualifiers);
    }

    #[test]
    fn jabber_implies_impp() {
        assert!(protocol_qualifiers(ImProtocol::Jabber)
            .sub_types
            .contains(&SubType::Account(AccountKind::Impp)));
        assert!(protocol_qualifiers(ImProtocol::Skype).is_empty());
    }

    #[test]
    fn preferred_marker_detection() {
        assert!(is_preferred_parameter("PREF"));
        assert!(!is_preferred_parameter("home"));
    }
}
