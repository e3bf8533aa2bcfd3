//! # store-tracker-remote
//!
//! Record model and remote document-collection client for the store visit tracker.
//!
//! The crate exposes one abstraction, [`StoreCollection`], covering the
//! operations the tracker needs from its remote store: an aggregate count,
//! full and paged reads, single-record writes and batched (atomic, at most
//! [`MAX_BATCH_SIZE`] operations) writes and deletes.
//!
//! ## Feature Flags
//!
//! - **`firestore`** *(default)*: Cloud Firestore REST v1 backend.
//! - **`rustls`** *(default)*: Use rustls for TLS.
//! - **`native-tls`**: Use the platform's native TLS implementation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use store_tracker_remote::{create_collection, FirestoreConfig, StoreCollection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = FirestoreConfig::new("my-project");
//!     config.id_token = Some("id-token".to_string());
//!     let collection = create_collection(config)?;
//!
//!     println!("{} stores", collection.count().await?);
//!
//!     let page = collection.fetch_page(500, None).await?;
//!     for record in &page.records {
//!         println!("{} {} {}", record.id, record.prefecture, record.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, RemoteError>`](RemoteError). Every call is a
//! single physical request; nothing is retried here. Callers decide whether to
//! retry with [`RemoteError::is_transient`]:
//!
//! - [`RemoteError::Unavailable`], [`RemoteError::Timeout`], [`RemoteError::Aborted`],
//!   [`RemoteError::RateLimited`], [`RemoteError::NetworkError`]: transient
//! - [`RemoteError::PermissionDenied`], [`RemoteError::InvalidParameter`],
//!   [`RemoteError::QuotaExceeded`]: fatal

mod backends;
mod error;
mod factory;
mod http_client;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{RemoteError, Result};

// Re-export factory functions
pub use factory::create_collection;

// Re-export core trait only (internal traits are not exported)
pub use traits::{StoreCollection, check_batch_size};

// Re-export types
pub use types::{
    FirestoreConfig, MAX_BATCH_SIZE, MEMO_MAX_CHARS, RecordPage, RecordValidationError,
    StoreRecord, StoreRecordPatch,
};

// Re-export utils module
pub use utils::lenient;

// Re-export concrete backends (behind feature flags)
#[cfg(feature = "firestore")]
pub use backends::FirestoreCollection;

// Backend helpers
pub use backends::common::emulator_base_url;
