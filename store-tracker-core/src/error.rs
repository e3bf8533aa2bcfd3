//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use store_tracker_remote::{RecordValidationError, RemoteError};

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Record not found
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// A bulk operation is already running on this engine
    #[error("Another bulk operation is already in progress")]
    OperationInProgress,

    /// Only records marked closed may be deleted
    #[error("Store '{0}' is not marked closed and cannot be deleted")]
    DeleteNotAllowed(String),

    /// Record invariant violation (structured)
    #[error("{0}")]
    InvalidRecord(RecordValidationError),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Import and export errors
    #[error("Import/Export error: {0}")]
    ImportExportError(String),

    /// No backup snapshot in the local cache (when restoring)
    #[error("No backup available")]
    NoBackup,

    /// The collection still holds records after every delete round
    #[error("Collection still holds {remaining} records after {rounds} delete rounds")]
    DeleteVerificationFailed { remaining: u64, rounds: u32 },

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Signed-in user is not on the allow-list
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Remote error (converting from library)
    #[error("{0}")]
    Remote(#[from] RemoteError),
}

impl From<RecordValidationError> for CoreError {
    fn from(err: RecordValidationError) -> Self {
        Self::InvalidRecord(err)
    }
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::RecordNotFound(_)
            | Self::OperationInProgress
            | Self::DeleteNotAllowed(_)
            | Self::InvalidRecord(_)
            | Self::ValidationError(_)
            | Self::NoBackup
            | Self::AccessDenied(_) => true,
            Self::Remote(e) => e.is_expected(),
            _ => false,
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
