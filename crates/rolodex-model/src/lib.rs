//! Rolodex Model - Field model for unified contacts
//!
//! Provides:
//! - [`FieldCategory`]: the closed set of contact detail categories and their update order
//! - [`FieldValue`]: one value shape per category
//! - [`Qualifiers`]: contexts and category-specific sub-types
//! - [`ProvenanceTag`]: `<record>.<slot>` tags tying fields to backing records
//! - [`LogicalContact`] and [`PreferredDetails`]
//! - [`vocabulary`]: mapping qualifiers to and from record parameter strings
//!
//! # Example
//!
//! ```rust
//! use rolodex_model::{provenance, Field, FieldValue, LogicalContact};
//!
//! let contact = LogicalContact::new("c1".into())
//!     .with_field(Field::new(FieldValue::Phone("123".into())).with_tag(provenance::tag(0, 1)));
//!
//! let phone = &contact.fields(rolodex_model::FieldCategory::Phone)[0];
//! assert_eq!(provenance::parse(phone.tag.as_deref().unwrap()), Ok((0, 1)));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod category;
pub mod contact;
pub mod field;
pub mod provenance;
pub mod qualifier;
pub mod value;
pub mod vocabulary;

// Re-exports
pub use category::{Cardinality, FieldCategory};
pub use contact::{ContactId, LogicalContact, PreferredDetails};
pub use field::Field;
pub use provenance::{ProvenanceError, ProvenanceTag};
pub use qualifier::{AccountKind, AddressKind, Context, PhoneKind, Qualifiers, SubType};
pub use value::{FieldValue, ImProtocol, OnlineAccount, PostalAddress, Role, StructuredName};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with contact fields
    pub use crate::{
        ContactId, Field, FieldCategory, FieldValue, LogicalContact, ProvenanceTag, Qualifiers,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
