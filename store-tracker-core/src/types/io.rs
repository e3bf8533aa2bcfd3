//! Import/export related types.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::StoreRecord;

/// Interchange file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Csv,
}

impl DataFormat {
    /// Detects the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(CoreError::ImportExportError(format!(
                "Unsupported file type: {}",
                path.display()
            ))),
        }
    }

    /// Suggested file name for a full export.
    pub fn default_filename(self) -> &'static str {
        match self {
            Self::Json => "Stores.json",
            Self::Csv => "Stores.csv",
        }
    }
}

/// Serialized export ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub content: String,
    pub suggested_filename: String,
}

/// Last-known-good copy of the collection kept in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub records: Vec<StoreRecord>,
    #[serde(with = "crate::utils::datetime")]
    pub taken_at: DateTime<Utc>,
}

impl BackupSnapshot {
    pub fn new(records: Vec<StoreRecord>) -> Self {
        Self {
            records,
            taken_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DataFormat::from_path(Path::new("a/Stores.JSON")).unwrap(),
            DataFormat::Json
        );
        assert_eq!(
            DataFormat::from_path(Path::new("list.csv")).unwrap(),
            DataFormat::Csv
        );
        assert!(matches!(
            DataFormat::from_path(Path::new("list.xlsx")),
            Err(CoreError::ImportExportError(_))
        ));
        assert!(DataFormat::from_path(Path::new("noext")).is_err());
    }
}
