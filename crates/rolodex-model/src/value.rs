//! Field values
//!
//! One variant per [`FieldCategory`], each carrying its own shape.

use crate::category::FieldCategory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured personal name
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StructuredName {
    /// Family name
    pub family: String,
    /// Given name
    pub given: String,
    /// Additional (middle) names
    pub additional: String,
    /// Honorific prefixes
    pub prefixes: String,
    /// Honorific suffixes
    pub suffixes: String,
}

impl StructuredName {
    /// Name from given and family parts
    #[must_use]
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
            ..Self::default()
        }
    }

    /// True when every part is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.family.is_empty()
            && self.given.is_empty()
            && self.additional.is_empty()
            && self.prefixes.is_empty()
            && self.suffixes.is_empty()
    }

    /// "given family", skipping empty parts
    #[must_use]
    pub fn display_label(&self) -> String {
        [self.given.as_str(), self.family.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Postal address
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PostalAddress {
    /// Post office box
    pub po_box: String,
    /// Extended address
    pub extension: String,
    /// Street
    pub street: String,
    /// City
    pub locality: String,
    /// State or province
    pub region: String,
    /// Postal code
    pub postal_code: String,
    /// Country
    pub country: String,
}

impl PostalAddress {
    /// True when every part is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.po_box.is_empty()
            && self.extension.is_empty()
            && self.street.is_empty()
            && self.locality.is_empty()
            && self.region.is_empty()
            && self.postal_code.is_empty()
            && self.country.is_empty()
    }
}

/// Organization role
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Role {
    /// Organization name
    pub organization: String,
    /// Job title
    pub title: String,
    /// Role within the organization
    pub role: String,
}

impl Role {
    /// True when every part is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.organization.is_empty() && self.title.is_empty() && self.role.is_empty()
    }
}

/// Instant-messaging protocol
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ImProtocol {
    /// AOL Instant Messenger
    Aim,
    /// ICQ
    Icq,
    /// IRC
    Irc,
    /// XMPP
    Jabber,
    /// MSN
    Msn,
    /// QQ
    Qq,
    /// Skype
    Skype,
    /// Yahoo
    Yahoo,
    /// Anything else
    #[default]
    Unknown,
}

impl ImProtocol {
    /// Every protocol
    pub const ALL: [ImProtocol; 9] = [
        Self::Aim,
        Self::Icq,
        Self::Irc,
        Self::Jabber,
        Self::Msn,
        Self::Qq,
        Self::Skype,
        Self::Yahoo,
        Self::Unknown,
    ];

    /// Protocol name used as the key of a record's account map
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aim => "aim",
            Self::Icq => "icq",
            Self::Irc => "irc",
            Self::Jabber => "jabber",
            Self::Msn => "msn",
            Self::Qq => "qq",
            Self::Skype => "skype",
            Self::Yahoo => "yahoo",
            Self::Unknown => "unknown",
        }
    }

    /// Case-insensitive parse; unrecognized names map to `Unknown`
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for ImProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instant-messaging account
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OnlineAccount {
    /// Protocol
    pub protocol: ImProtocol,
    /// Account address
    pub address: String,
}

impl OnlineAccount {
    /// Account on a protocol
    #[must_use]
    pub fn new(protocol: ImProtocol, address: impl Into<String>) -> Self {
        Self {
            protocol,
            address: address.into(),
        }
    }
}

/// Value of one contact field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "value", rename_all = "kebab-case")]
pub enum FieldValue {
    /// Postal address
    Address(PostalAddress),
    /// Avatar URI
    Avatar(String),
    /// Date of birth
    Birthday(NaiveDate),
    /// Full name / display label
    FullName(String),
    /// Email address
    Email(String),
    /// Favorite flag
    Favorite(bool),
    /// Structured name
    Name(StructuredName),
    /// Nickname
    Nickname(String),
    /// Note text
    Note(String),
    /// Instant-messaging account
    OnlineAccount(OnlineAccount),
    /// Organization role
    Organization(Role),
    /// Phone number
    Phone(String),
    /// Web address
    Url(String),
}

impl FieldValue {
    /// Category this value belongs to
    #[must_use]
    pub const fn category(&self) -> FieldCategory {
        match self {
            Self::Address(_) => FieldCategory::Address,
            Self::Avatar(_) => FieldCategory::Avatar,
            Self::Birthday(_) => FieldCategory::Birthday,
            Self::FullName(_) => FieldCategory::FullName,
            Self::Email(_) => FieldCategory::Email,
            Self::Favorite(_) => FieldCategory::Favorite,
            Self::Name(_) => FieldCategory::Name,
            Self::Nickname(_) => FieldCategory::Nickname,
            Self::Note(_) => FieldCategory::Note,
            Self::OnlineAccount(_) => FieldCategory::OnlineAccount,
            Self::Organization(_) => FieldCategory::Organization,
            Self::Phone(_) => FieldCategory::Phone,
            Self::Url(_) => FieldCategory::Url,
        }
    }

    /// True for values that carry no information.
    ///
    /// A favorite flag is never empty: `false` is a real value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Address(address) => address.is_empty(),
            Self::Name(name) => name.is_empty(),
            Self::Organization(role) => role.is_empty(),
            Self::OnlineAccount(account) => account.address.is_empty(),
            Self::Birthday(_) | Self::Favorite(_) => false,
            Self::Avatar(s)
            | Self::FullName(s)
            | Self::Email(s)
            | Self::Nickname(s)
            | Self::Note(s)
            | Self::Phone(s)
            | Self::Url(s) => s.is_empty(),
        }
    }
}
