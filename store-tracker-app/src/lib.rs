//! Platform-agnostic application layer for the store visit tracker.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter
//! injection), configuration loading and the file-backed local cache.

pub mod access;
pub mod adapters;
pub mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use store_tracker_core::error::{CoreError, CoreResult};
use store_tracker_core::services::{
    BulkProgressListener, BulkReplaceOptions, BulkReplaceService, ImportExportService,
    MetricsRecorder, ServiceContext, StoreService,
};
use store_tracker_core::traits::LocalCache;
use store_tracker_core::types::{
    BackupSnapshot, DataFormat, MetricsReport, OperationMetrics, StoreRecord,
};
use store_tracker_core::RetryPolicy;
use store_tracker_remote::StoreCollection;

pub use access::AccessGate;
pub use adapters::FileLocalCache;
pub use config::AppConfig;

const DEFAULT_STORES_JSON: &str = include_str!("../data/default_stores.json");

/// Built-in dataset used by `reset_to_defaults`.
pub fn default_stores() -> CoreResult<Vec<StoreRecord>> {
    ImportExportService::parse_json(DEFAULT_STORES_JSON)
}

/// Platform-agnostic application state.
///
/// Every frontend constructs this once at startup via `AppStateBuilder`.
/// Bulk operations update the local cache only after they succeed.
pub struct AppState {
    /// Service context (remote collection and local cache)
    pub ctx: Arc<ServiceContext>,
    /// Whole-collection replace
    pub bulk_service: BulkReplaceService,
    /// Single-store operations
    pub store_service: StoreService,
    /// Operation history (bulk replaces and single-store writes)
    pub metrics: Arc<MetricsRecorder>,
    access: AccessGate,
    user_email: Option<String>,
    defaults: Vec<StoreRecord>,
}

impl AppState {
    /// 检查当前账户权限
    pub fn authorize(&self) -> CoreResult<()> {
        self.access.check(self.user_email.as_deref())
    }

    /// 从文件导入（整体替换）
    pub async fn import_file(&self, path: &Path) -> CoreResult<OperationMetrics> {
        self.authorize()?;
        let format = DataFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            CoreError::ImportExportError(format!("failed to read {}: {e}", path.display()))
        })?;
        let records = ImportExportService::parse(&content, format)?;

        let metrics = self.bulk_service.import_from(&records).await?;
        self.after_success(records, &metrics).await;
        Ok(metrics)
    }

    /// 从本地缓存的最近备份恢复
    pub async fn restore_backup(&self) -> CoreResult<OperationMetrics> {
        self.authorize()?;
        let snapshot = self
            .ctx
            .local_cache
            .load_snapshot()
            .await?
            .ok_or(CoreError::NoBackup)?;
        log::info!(
            "Restoring {} records from backup taken at {}",
            snapshot.records.len(),
            snapshot.taken_at
        );

        let metrics = self.bulk_service.restore_from(&snapshot.records).await?;
        self.after_success(snapshot.records, &metrics).await;
        Ok(metrics)
    }

    /// 用内置数据重置
    pub async fn reset_to_defaults(&self) -> CoreResult<OperationMetrics> {
        self.authorize()?;
        let metrics = self.bulk_service.reset_to_defaults(&self.defaults).await?;
        self.after_success(self.defaults.clone(), &metrics).await;
        Ok(metrics)
    }

    /// 导出到文件（格式由扩展名决定）
    ///
    /// A JSON export also refreshes the local backup snapshot.
    pub async fn export_file(&self, path: &Path) -> CoreResult<usize> {
        self.authorize()?;
        let format = DataFormat::from_path(path)?;
        let records = self.store_service.list_stores().await?;
        let file = ImportExportService::export(&records, format)?;
        write_file(path, &file.content).await?;

        if format == DataFormat::Json {
            self.save_snapshot(BackupSnapshot::new(records.clone())).await?;
        }
        log::info!("Exported {} records to {}", records.len(), path.display());
        Ok(records.len())
    }

    /// 保存带时间戳的备份文件，并更新本地快照
    pub async fn backup_now(&self, dir: &Path) -> CoreResult<PathBuf> {
        self.authorize()?;
        let records = self.store_service.list_stores().await?;
        if records.is_empty() {
            return Err(CoreError::ValidationError("no stores to back up".to_string()));
        }

        let snapshot = BackupSnapshot::new(records);
        let file = ImportExportService::backup(&snapshot.records, &snapshot.taken_at)?;
        let path = dir.join(&file.suggested_filename);
        write_file(&path, &file.content).await?;
        self.save_snapshot(snapshot).await?;

        log::info!("Backup written to {}", path.display());
        Ok(path)
    }

    /// Time of the cached backup snapshot, if any.
    pub async fn backup_timestamp(&self) -> CoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .ctx
            .local_cache
            .load_snapshot()
            .await?
            .map(|s| s.taken_at))
    }

    /// 操作记录（最近的在前）
    pub async fn metrics(&self) -> Vec<MetricsReport> {
        self.metrics.reports().await
    }

    async fn save_snapshot(&self, snapshot: BackupSnapshot) -> CoreResult<()> {
        self.ctx.local_cache.save_snapshot(&snapshot).await
    }

    /// Caches the written records and the new metrics entry.
    ///
    /// The remote collection has already been replaced at this point, so cache
    /// failures are logged instead of failing the operation.
    async fn after_success(&self, records: Vec<StoreRecord>, metrics: &OperationMetrics) {
        let written: Vec<StoreRecord> = records.into_iter().filter(StoreRecord::has_id).collect();
        if let Err(e) = self.save_snapshot(BackupSnapshot::new(written)).await {
            log::error!("Failed to save backup snapshot: {e}");
        }

        if let Err(e) = self
            .metrics
            .record_persisted(metrics.clone(), self.ctx.local_cache.as_ref())
            .await
        {
            log::error!("Failed to save metrics history: {e}");
        }
    }
}

async fn write_file(path: &Path, content: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::ImportExportError(e.to_string()))?;
    }
    tokio::fs::write(path, content).await.map_err(|e| {
        CoreError::ImportExportError(format!("failed to write {}: {e}", path.display()))
    })
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `collection`: the remote store collection
/// - `local_cache`: where backups and metrics are kept
///
/// # Optional
/// - `defaults`: defaults to the embedded `data/default_stores.json`
pub struct AppStateBuilder {
    collection: Option<Arc<dyn StoreCollection>>,
    local_cache: Option<Arc<dyn LocalCache>>,
    options: BulkReplaceOptions,
    retry: RetryPolicy,
    listener: Option<Arc<dyn BulkProgressListener>>,
    access: AccessGate,
    user_email: Option<String>,
    defaults: Option<Vec<StoreRecord>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collection: None,
            local_cache: None,
            options: BulkReplaceOptions::default(),
            retry: RetryPolicy::default(),
            listener: None,
            access: AccessGate::default(),
            user_email: None,
            defaults: None,
        }
    }

    /// Builder wired from configuration: Firestore collection and file cache.
    pub fn from_config(config: &AppConfig) -> CoreResult<Self> {
        let collection = store_tracker_remote::create_collection(config.firestore_config()?)?;
        Ok(Self::new()
            .collection(collection)
            .local_cache(Arc::new(FileLocalCache::new(&config.cache.dir)))
            .options(config.bulk_options())
            .retry(config.retry_policy())
            .access(AccessGate::new(&config.access.allowed_emails))
            .user_email(config.access.user_email.clone()))
    }

    #[must_use]
    pub fn collection(mut self, collection: Arc<dyn StoreCollection>) -> Self {
        self.collection = Some(collection);
        self
    }

    #[must_use]
    pub fn local_cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.local_cache = Some(cache);
        self
    }

    #[must_use]
    pub fn options(mut self, options: BulkReplaceOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn BulkProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    #[must_use]
    pub fn access(mut self, access: AccessGate) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn user_email(mut self, email: Option<String>) -> Self {
        self.user_email = email;
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: Vec<StoreRecord>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Build the `AppState`, seeding the metrics history from the cache.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing.
    pub async fn build(self) -> CoreResult<AppState> {
        let collection = self
            .collection
            .ok_or_else(|| CoreError::ValidationError("collection is required".to_string()))?;
        let local_cache = self
            .local_cache
            .ok_or_else(|| CoreError::ValidationError("local_cache is required".to_string()))?;
        let defaults = match self.defaults {
            Some(defaults) => defaults,
            None => default_stores()?,
        };

        let metrics = Arc::new(match MetricsRecorder::load(local_cache.as_ref()).await {
            Ok(recorder) => recorder,
            Err(e) => {
                log::warn!("Failed to load metrics history, starting empty: {e}");
                MetricsRecorder::new()
            }
        });

        let ctx = Arc::new(ServiceContext::new(collection, local_cache));
        let mut bulk_service = BulkReplaceService::with_options(Arc::clone(&ctx), self.options);
        if let Some(listener) = self.listener {
            bulk_service = bulk_service.with_listener(listener);
        }
        let store_service =
            StoreService::with_retry(Arc::clone(&ctx), self.retry).with_recorder(Arc::clone(&metrics));

        Ok(AppState {
            ctx,
            bulk_service,
            store_service,
            metrics,
            access: self.access,
            user_email: self.user_email,
            defaults,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
