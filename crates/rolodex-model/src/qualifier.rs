//! Enumerated field qualifiers
//!
//! Contexts apply to every category; sub-types only to the category they
//! describe. The string spellings live in constant tables next to each
//! enum and are matched case-insensitively.

use crate::category::FieldCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Case-insensitive lookup in a spelling table
fn lookup<T: Copy>(table: &[(T, &str)], text: &str) -> Option<T> {
    table
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(text))
        .map(|(value, _)| *value)
}

/// Where a detail is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    /// Personal
    Home,
    /// Professional
    Work,
    /// Neither
    Other,
}

const CONTEXT_NAMES: [(Context, &str); 3] = [
    (Context::Home, "home"),
    (Context::Work, "work"),
    (Context::Other, "other"),
];

impl Context {
    /// Canonical spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
            Self::Other => "other",
        }
    }

    /// Case-insensitive parse of a spelling
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        lookup(&CONTEXT_NAMES, text)
    }
}

/// Phone number kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum PhoneKind {
    Landline,
    Mobile,
    Fax,
    Pager,
    Voice,
    Modem,
    Video,
    Car,
    BulletinBoard,
    Messaging,
    Assistant,
    DtmfMenu,
}

const PHONE_KIND_NAMES: [(PhoneKind, &str); 13] = [
    (PhoneKind::Landline, "landline"),
    (PhoneKind::Mobile, "cell"),
    (PhoneKind::Fax, "fax"),
    (PhoneKind::Pager, "pager"),
    (PhoneKind::Voice, "voice"),
    (PhoneKind::Modem, "modem"),
    (PhoneKind::Video, "video"),
    (PhoneKind::Car, "car"),
    (PhoneKind::BulletinBoard, "bulletinboard"),
    (PhoneKind::Messaging, "messaging"),
    (PhoneKind::Assistant, "assistant"),
    (PhoneKind::DtmfMenu, "dtmfmenu"),
    (PhoneKind::Mobile, "mobile"),
];

impl PhoneKind {
    /// Canonical spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landline => "landline",
            Self::Mobile => "cell",
            Self::Fax => "fax",
            Self::Pager => "pager",
            Self::Voice => "voice",
            Self::Modem => "modem",
            Self::Video => "video",
            Self::Car => "car",
            Self::BulletinBoard => "bulletinboard",
            Self::Messaging => "messaging",
            Self::Assistant => "assistant",
            Self::DtmfMenu => "dtmfmenu",
        }
    }

    /// Case-insensitive parse of a spelling
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        lookup(&PHONE_KIND_NAMES, text)
    }
}

/// Postal address kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum AddressKind {
    Parcel,
    Postal,
    Domestic,
    International,
}

const ADDRESS_KIND_NAMES: [(AddressKind, &str); 4] = [
    (AddressKind::Parcel, "parcel"),
    (AddressKind::Postal, "postal"),
    (AddressKind::Domestic, "domestic"),
    (AddressKind::International, "international"),
];

impl AddressKind {
    /// Canonical spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parcel => "parcel",
            Self::Postal => "postal",
            Self::Domestic => "domestic",
            Self::International => "international",
        }
    }

    /// Case-insensitive parse of a spelling
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        lookup(&ADDRESS_KIND_NAMES, text)
    }
}

/// Online account kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum AccountKind {
    Sip,
    SipVoip,
    Impp,
    VideoShare,
}

const ACCOUNT_KIND_NAMES: [(AccountKind, &str); 4] = [
    (AccountKind::Sip, "sip"),
    (AccountKind::SipVoip, "sipvoip"),
    (AccountKind::Impp, "impp"),
    (AccountKind::VideoShare, "videoshare"),
];

impl AccountKind {
    /// Canonical spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sip => "sip",
            Self::SipVoip => "sipvoip",
            Self::Impp => "impp",
            Self::VideoShare => "videoshare",
        }
    }

    /// Case-insensitive parse of a spelling
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        lookup(&ACCOUNT_KIND_NAMES, text)
    }
}

/// Category-specific sub-type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "of", content = "kind", rename_all = "kebab-case")]
pub enum SubType {
    /// Phone sub-type
    Phone(PhoneKind),
    /// Address sub-type
    Address(AddressKind),
    /// Online account sub-type
    Account(AccountKind),
}

impl SubType {
    /// Whether this sub-type describes values of `category`
    #[inline]
    #[must_use]
    pub const fn applies_to(self, category: FieldCategory) -> bool {
        matches!(
            (self, category),
            (Self::Phone(_), FieldCategory::Phone)
                | (Self::Address(_), FieldCategory::Address)
                | (Self::Account(_), FieldCategory::OnlineAccount)
        )
    }

    /// Canonical spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phone(kind) => kind.as_str(),
            Self::Address(kind) => kind.as_str(),
            Self::Account(kind) => kind.as_str(),
        }
    }

    /// Parse a spelling in the vocabulary of `category`
    #[must_use]
    pub fn parse_for(category: FieldCategory, text: &str) -> Option<Self> {
        match category {
            FieldCategory::Phone => PhoneKind::parse(text).map(Self::Phone),
            FieldCategory::Address => AddressKind::parse(text).map(Self::Address),
            FieldCategory::OnlineAccount => AccountKind::parse(text).map(Self::Account),
            _ => None,
        }
    }
}

/// Contexts and sub-types of one field
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Qualifiers {
    /// Usage contexts
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub contexts: BTreeSet<Context>,
    /// Category-specific sub-types
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sub_types: BTreeSet<SubType>,
}

impl Qualifiers {
    /// No qualifiers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.contexts.insert(context);
        self
    }

    /// With a sub-type
    #[inline]
    #[must_use]
    pub fn with_sub_type(mut self, sub_type: SubType) -> Self {
        self.sub_types.insert(sub_type);
        self
    }

    /// True when nothing is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty() && self.sub_types.is_empty()
    }
}
