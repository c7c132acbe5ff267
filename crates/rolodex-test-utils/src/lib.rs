//! Testing utilities for the Rolodex workspace
//!
//! An in-memory aggregator that journals every backend call, plus fixtures.

#![allow(missing_docs)]

pub mod fixtures;
pub mod memory;

pub use fixtures::{
    aggregator, birthday, rich_contact, snapshot, two_record_contact, LOCAL_STORE, READ_ONLY_STORE,
    REMOTE_STORE,
};
pub use memory::{InMemoryAggregator, InMemoryRecord, Operation, RecordSeed};
