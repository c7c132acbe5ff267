//! Rolodex Service - Unified contacts over an aggregator
//!
//! Provides:
//! - [`AddressBook`]: `get_unified_contact`, `update`, `update_contacts`, `copy`,
//!   `contact_ids`, `sources`
//! - [`ChangeNotifier`]: debounced added/removed/updated batches
//! - [`ServiceConfig`]: TOML configuration
//! - [`logging::init`]: tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use rolodex_service::{AddressBook, ServiceConfig};
//!
//! let config = ServiceConfig::load("rolodex.toml")?;
//! rolodex_service::logging::init(&config.log);
//!
//! let book = AddressBook::new(aggregator, config);
//! let mut contact = book.get_unified_contact(&id)?;
//! contact.push(Field::new(FieldValue::Nickname("Bo".into())));
//! book.update(&id, contact).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod address_book;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;

// Re-exports
pub use address_book::AddressBook;
pub use config::{LogConfig, ServiceConfig};
pub use error::{ConfigError, ServiceError};
pub use notify::{BroadcastSink, ChangeKind, ChangeNotifier, ChangeSink, ContactChange, PendingChanges};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for serving unified contacts
    pub use crate::{AddressBook, ChangeKind, ContactChange, ServiceConfig, ServiceError};
    pub use rolodex_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
