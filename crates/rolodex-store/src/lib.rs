//! Rolodex Store - Backing records and the unified contact builder
//!
//! Provides:
//! - [`BackingRecord`] and [`Aggregator`]: the interfaces consumed from the aggregation layer
//! - [`CategoryData`]: per-category record values in their stored shape
//! - [`Capabilities`] and [`RecordSet`]: the capability filter with per-record caching
//! - [`build`]: assembling one [`LogicalContact`](rolodex_model::LogicalContact) from many records
//!
//! # Example
//!
//! ```rust,ignore
//! use rolodex_store::{build, RecordSet};
//!
//! let records = RecordSet::from_records(aggregator.records(&id).unwrap_or_default());
//! let contact = build(&id, &records);
//! for field in contact.iter_fields() {
//!     println!("{:?} from {:?}", field.value, field.tag);
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod aggregator;
pub mod builder;
pub mod capability;
pub mod record;

// Re-exports
pub use aggregator::{Aggregator, AggregatorError, AggregatorEvent, SourceInfo};
pub use builder::build;
pub use capability::{capabilities, Capabilities, RecordHandle, RecordSet};
pub use record::{
    BackingRecord, CategoryData, CategorySnapshot, CategoryUpdate, RecordField, RecordRef,
    SlottedField, StoreError, SINGLE_VALUE_SLOT,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
