//! 业务逻辑服务层

mod bulk_replace_service;
mod import_export_service;
mod metrics_service;
mod store_service;

pub use bulk_replace_service::{
    BulkProgress, BulkProgressListener, BulkReplaceOptions, BulkReplaceService,
};
pub use import_export_service::{ImportExportService, CSV_COLUMNS};
pub use metrics_service::{MetricsRecorder, METRICS_HISTORY_LIMIT};
pub use store_service::StoreService;

use std::sync::Arc;

use store_tracker_remote::StoreCollection;

use crate::traits::LocalCache;

/// 服务上下文 - 持有所有依赖
///
/// 平台层需要创建此上下文，并注入远程集合与本地缓存的具体实现。
pub struct ServiceContext {
    /// 远程店铺集合
    pub collection: Arc<dyn StoreCollection>,
    /// 本地缓存（备份快照与操作记录）
    pub local_cache: Arc<dyn LocalCache>,
}

impl ServiceContext {
    /// 创建服务上下文
    #[must_use]
    pub fn new(collection: Arc<dyn StoreCollection>, local_cache: Arc<dyn LocalCache>) -> Self {
        Self {
            collection,
            local_cache,
        }
    }

    /// 远程集合引用
    pub fn collection(&self) -> &dyn StoreCollection {
        self.collection.as_ref()
    }
}
