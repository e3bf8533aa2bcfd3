//! 类型定义模块

mod io;
mod metrics;
mod store;

pub use io::{BackupSnapshot, DataFormat, ExportFile};
pub use metrics::{
    format_duration, HistoryEntry, MetricsReport, OperationKind, OperationMetrics, RecordAction,
    RecordOperationLog,
};
pub use store::{NewStore, PrefectureStats, RegionSummary, StoreFilter};

// Re-export remote 库的公共类型
pub use store_tracker_remote::{
    RecordPage, RecordValidationError, StoreRecord, StoreRecordPatch, MAX_BATCH_SIZE,
    MEMO_MAX_CHARS,
};
