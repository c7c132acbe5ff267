//! Rolodex Sync - Diff and update engine
//!
//! Propagates an edited contact back to the records it was built from:
//! - Diffs desired against current, one category at a time, in a fixed order
//! - Routes each change to the record that owns it, by provenance tag
//! - Creates and links a new record when no record can take a category
//! - Awaits every backend call before issuing the next
//! - Stops at the first error and rebuilds the contact either way
//!
//! # Example
//!
//! ```rust,ignore
//! use rolodex_sync::UpdateSession;
//!
//! let session = UpdateSession::new(aggregator, records, current, desired);
//! let outcome = session.run().await;
//! if let Err(error) = outcome.result {
//!     eprintln!("update failed: {error}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod diff;
pub mod error;
pub mod fallback;
pub mod session;

// Re-exports
pub use diff::{same_field_set, CategoryPlan, DiffContext, RecordWrite};
pub use error::SyncError;
pub use fallback::{CreationFallback, LinkedRecord};
pub use session::{Rebuilt, SessionOutcome, SessionState, SessionStats, Step, UpdateSession};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running update sessions
    pub use crate::{SessionOutcome, SessionState, SyncError, UpdateSession};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
