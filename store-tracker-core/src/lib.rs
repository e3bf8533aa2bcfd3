//! Store Tracker Core Library
//!
//! Provides the sync logic of the store visit tracker, including:
//! - Retry wrapper for remote calls (`retry`)
//! - Whole-collection replace: import, restore, reset (Bulk Replace Service)
//! - Operation metrics history (Metrics Recorder)
//! - JSON / CSV import and export (Import Export Service)
//! - Single-store edits and list statistics (Store Service)
//!
//! The remote store and local cache are injected through traits, so the
//! same services run against Firestore, an emulator or in-memory mocks.

pub mod error;
pub mod retry;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use retry::{with_retry, RetryPolicy, TransientError};
pub use services::ServiceContext;
pub use traits::LocalCache;
