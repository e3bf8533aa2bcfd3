//! Remote collection backends

/// Shared utilities used by backend implementations.
pub mod common;

#[cfg(feature = "firestore")]
mod firestore;

#[cfg(feature = "firestore")]
pub use firestore::FirestoreCollection;
