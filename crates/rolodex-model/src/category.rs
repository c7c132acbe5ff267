//! Field categories
//!
//! The category set is closed. Every layer matches it exhaustively, so a new
//! category fails to compile until the builder, the mapper and the engine
//! all handle it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many values of a category one backing record may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one value per record
    Single,
    /// Any number of values per record
    Multiple,
}

/// One category of contact detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldCategory {
    /// Postal addresses
    Address,
    /// Avatar image location
    Avatar,
    /// Date of birth
    Birthday,
    /// Full name, used as the display label
    FullName,
    /// Email addresses
    Email,
    /// Favorite flag
    Favorite,
    /// Structured name
    Name,
    /// Nickname
    Nickname,
    /// Free-text notes
    Note,
    /// Instant-messaging accounts
    OnlineAccount,
    /// Organization roles
    Organization,
    /// Phone numbers
    Phone,
    /// Web addresses
    Url,
}

impl FieldCategory {
    /// Every category, in declaration order
    pub const ALL: [FieldCategory; 13] = [
        Self::Address,
        Self::Avatar,
        Self::Birthday,
        Self::FullName,
        Self::Email,
        Self::Favorite,
        Self::Name,
        Self::Nickname,
        Self::Note,
        Self::OnlineAccount,
        Self::Organization,
        Self::Phone,
        Self::Url,
    ];

    /// Order in which an update session reconciles categories.
    ///
    /// Online accounts take the slot email would otherwise occupy: some
    /// stores derive accounts from email addresses and must see the account
    /// change before the email change.
    pub const UPDATE_ORDER: [FieldCategory; 13] = [
        Self::Address,
        Self::Avatar,
        Self::Birthday,
        Self::FullName,
        Self::OnlineAccount,
        Self::Favorite,
        Self::Name,
        Self::Nickname,
        Self::Note,
        Self::Email,
        Self::Organization,
        Self::Phone,
        Self::Url,
    ];

    /// Values per record
    #[inline]
    #[must_use]
    pub const fn cardinality(self) -> Cardinality {
        match self {
            Self::Avatar
            | Self::Birthday
            | Self::FullName
            | Self::Favorite
            | Self::Name
            | Self::Nickname => Cardinality::Single,
            Self::Address
            | Self::Email
            | Self::Note
            | Self::OnlineAccount
            | Self::Organization
            | Self::Phone
            | Self::Url => Cardinality::Multiple,
        }
    }

    /// Whether one value of this category can be marked preferred
    #[inline]
    #[must_use]
    pub const fn tracks_preferred(self) -> bool {
        matches!(self.cardinality(), Cardinality::Multiple)
    }

    /// Short lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Avatar => "avatar",
            Self::Birthday => "birthday",
            Self::FullName => "full-name",
            Self::Email => "email",
            Self::Favorite => "favorite",
            Self::Name => "name",
            Self::Nickname => "nickname",
            Self::Note => "note",
            Self::OnlineAccount => "online-account",
            Self::Organization => "organization",
            Self::Phone => "phone",
            Self::Url => "url",
        }
    }

    /// Writable-property name a store uses for this category
    #[must_use]
    pub const fn property_name(self) -> &'static str {
        match self {
            Self::Address => "postal-addresses",
            Self::Avatar => "avatar",
            Self::Birthday => "birthday",
            Self::FullName => "full-name",
            Self::Email => "email-addresses",
            Self::Favorite => "is-favourite",
            Self::Name => "structured-name",
            Self::Nickname => "nickname",
            Self::Note => "notes",
            Self::OnlineAccount => "im-addresses",
            Self::Organization => "roles",
            Self::Phone => "phone-numbers",
            Self::Url => "urls",
        }
    }

    /// Parse a store's writable-property name
    #[must_use]
    pub fn from_property_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.property_name() == name)
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
