//! Operation history types: bulk replace metrics and single-store log entries.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Kind of bulk replace operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// Replace with the contents of an imported file.
    Import,
    /// Replace with the local backup snapshot.
    Restore,
    /// Replace with the built-in default dataset.
    Reset,
}

impl OperationKind {
    /// Human-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Import => "Import",
            Self::Restore => "Restore",
            Self::Reset => "Reset",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One retained log entry for a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetrics {
    pub operation: OperationKind,
    /// Remote count before anything was deleted.
    pub count_before: u64,
    /// Remote count after the delete phase.
    pub count_after_delete: u64,
    /// Records submitted in the write phase (non-empty id).
    pub count_written: u64,
    /// Records skipped for lacking an id.
    #[serde(default)]
    pub count_skipped: u64,
    /// Remote count after the write phase.
    pub count_after_write: u64,
    /// Wall-clock duration of the whole operation.
    pub duration_ms: u64,
    /// When the operation finished.
    #[serde(with = "crate::utils::datetime")]
    pub timestamp: DateTime<Utc>,
}

impl OperationMetrics {
    /// Whether the post-conditions held: empty after delete, and every
    /// written record counted afterwards.
    pub fn is_verified(&self) -> bool {
        self.count_after_delete == 0 && self.count_after_write == self.count_written
    }

    /// Display view of this entry.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            operation: self.operation.label().to_string(),
            store: None,
            count_before: Some(self.count_before),
            count_after_delete: Some(self.count_after_delete),
            count_written: Some(self.count_written),
            count_after_write: Some(self.count_after_write),
            duration: format_duration(self.duration_ms),
            executed_at: local_time(&self.timestamp),
        }
    }
}

/// Single-store write recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordAction {
    Add,
    Update,
    Delete,
}

impl RecordAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

/// Log entry for one add / update / delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOperationLog {
    pub action: RecordAction,
    /// Store name, or the id when the name is unknown.
    pub store: String,
    pub duration_ms: u64,
    #[serde(with = "crate::utils::datetime")]
    pub timestamp: DateTime<Utc>,
}

impl RecordOperationLog {
    pub fn new(action: RecordAction, store: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            action,
            store: store.into(),
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn report(&self) -> MetricsReport {
        // 单条操作通常不足一秒
        let duration = if self.duration_ms < 1000 {
            format!("{}ms", self.duration_ms)
        } else {
            format_duration(self.duration_ms)
        };
        MetricsReport {
            operation: self.action.label().to_string(),
            store: Some(self.store.clone()),
            count_before: None,
            count_after_delete: None,
            count_written: None,
            count_after_write: None,
            duration,
            executed_at: local_time(&self.timestamp),
        }
    }
}

/// One entry of the shared, bounded operation history.
///
/// Serialized without a tag; the two shapes are told apart by their fields
/// (`operation` vs `action`), so older history files holding only bulk
/// entries still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Bulk(OperationMetrics),
    Record(RecordOperationLog),
}

impl HistoryEntry {
    pub fn report(&self) -> MetricsReport {
        match self {
            Self::Bulk(m) => m.report(),
            Self::Record(log) => log.report(),
        }
    }

    pub fn as_bulk(&self) -> Option<&OperationMetrics> {
        match self {
            Self::Bulk(m) => Some(m),
            Self::Record(_) => None,
        }
    }
}

impl From<OperationMetrics> for HistoryEntry {
    fn from(m: OperationMetrics) -> Self {
        Self::Bulk(m)
    }
}

impl From<RecordOperationLog> for HistoryEntry {
    fn from(log: RecordOperationLog) -> Self {
        Self::Record(log)
    }
}

fn local_time(t: &DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Display form of a [`HistoryEntry`]. Counts are `None` for single-store
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    pub count_before: Option<u64>,
    pub count_after_delete: Option<u64>,
    pub count_written: Option<u64>,
    pub count_after_write: Option<u64>,
    /// `"{m}m {s}s"`, or `"{s}s"` under a minute.
    pub duration: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub executed_at: String,
}

/// Formats milliseconds as whole minutes and seconds.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
