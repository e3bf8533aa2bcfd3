//! 本地缓存抽象 Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{BackupSnapshot, HistoryEntry};

/// Last-known-good mirror of the remote collection plus the operation history.
///
/// 平台实现:
/// - App: `FileLocalCache` (JSON 文件)
/// - Tests: `MockLocalCache` (内存)
///
/// Callers write to the cache only after a bulk operation has succeeded, so a
/// failed operation leaves the previous snapshot intact.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// 读取最近一次备份
    ///
    /// # Returns
    /// * `Ok(Some(snapshot))` - 备份存在
    /// * `Ok(None)` - 尚无备份
    async fn load_snapshot(&self) -> CoreResult<Option<BackupSnapshot>>;

    /// 覆盖保存备份
    async fn save_snapshot(&self, snapshot: &BackupSnapshot) -> CoreResult<()>;

    /// 读取操作记录（最新在前）
    async fn load_metrics(&self) -> CoreResult<Vec<HistoryEntry>>;

    /// 覆盖保存操作记录
    async fn save_metrics(&self, history: &[HistoryEntry]) -> CoreResult<()>;
}
