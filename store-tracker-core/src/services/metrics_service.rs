//! 操作记录服务

use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::traits::LocalCache;
use crate::types::{HistoryEntry, MetricsReport};

/// Maximum number of retained entries.
pub const METRICS_HISTORY_LIMIT: usize = 20;

/// Bounded, most-recent-first history shared by bulk replaces and
/// single-store writes.
pub struct MetricsRecorder {
    history: RwLock<Vec<HistoryEntry>>,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::with_history(Vec::new())
    }

    /// Seeds the recorder; entries beyond the limit are dropped.
    pub fn with_history(mut history: Vec<HistoryEntry>) -> Self {
        history.truncate(METRICS_HISTORY_LIMIT);
        Self {
            history: RwLock::new(history),
        }
    }

    /// 从本地缓存加载历史
    pub async fn load(cache: &dyn LocalCache) -> CoreResult<Self> {
        let history = cache.load_metrics().await?;
        log::debug!("Loaded {} metrics entries from cache", history.len());
        Ok(Self::with_history(history))
    }

    /// 保存历史到本地缓存
    pub async fn persist(&self, cache: &dyn LocalCache) -> CoreResult<()> {
        let history = self.history.read().await;
        cache.save_metrics(&history).await
    }

    /// Prepends `entry`, evicting the oldest beyond the limit.
    pub async fn record(&self, entry: impl Into<HistoryEntry>) {
        let mut history = self.history.write().await;
        history.insert(0, entry.into());
        history.truncate(METRICS_HISTORY_LIMIT);
    }

    /// `record` followed by `persist`.
    pub async fn record_persisted(
        &self,
        entry: impl Into<HistoryEntry>,
        cache: &dyn LocalCache,
    ) -> CoreResult<()> {
        self.record(entry).await;
        self.persist(cache).await
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().await.clone()
    }

    pub async fn latest(&self) -> Option<HistoryEntry> {
        self.history.read().await.first().cloned()
    }

    /// Display views, most recent first.
    pub async fn reports(&self) -> Vec<MetricsReport> {
        self.history
            .read()
            .await
            .iter()
            .map(HistoryEntry::report)
            .collect()
    }
}
