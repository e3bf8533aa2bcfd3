//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use store_tracker_remote::{
    check_batch_size, RecordPage, RemoteError, Result as RemoteResult, StoreCollection,
    StoreRecord, StoreRecordPatch,
};
use tokio::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::traits::LocalCache;
use crate::types::{BackupSnapshot, HistoryEntry};

// ===== MockStoreCollection =====

/// Remote operation, for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Count,
    FetchAll,
    FetchPage,
    Put,
    Update,
    Delete,
    BatchWrite,
    BatchDelete,
}

/// In-memory collection ordered by id.
pub struct MockStoreCollection {
    records: Mutex<BTreeMap<String, StoreRecord>>,
    /// 每种操作排队的失败（先进先出）
    faults: Mutex<HashMap<MockOp, VecDeque<RemoteError>>>,
    calls: Mutex<HashMap<MockOp, u32>>,
    /// 模拟最终一致性：`Some(n)` 让下一次 count 返回 n，`None` 返回真实值
    count_readings: Mutex<VecDeque<Option<u64>>>,
    max_batch: Mutex<usize>,
}

impl MockStoreCollection {
    pub fn new(records: Vec<StoreRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            count_readings: Mutex::new(VecDeque::new()),
            max_batch: Mutex::new(0),
        }
    }

    /// 让 `op` 的下一次调用失败
    pub async fn fail_next(&self, op: MockOp, err: RemoteError) {
        self.faults.lock().await.entry(op).or_default().push_back(err);
    }

    /// 排队一次 count 读数
    pub async fn push_count_reading(&self, reading: Option<u64>) {
        self.count_readings.lock().await.push_back(reading);
    }

    pub async fn calls(&self, op: MockOp) -> u32 {
        self.calls.lock().await.get(&op).copied().unwrap_or(0)
    }

    /// 当前所有 ID（有序）
    pub async fn ids(&self) -> Vec<String> {
        self.records.lock().await.keys().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<StoreRecord> {
        self.records.lock().await.get(id).cloned()
    }

    /// 单次 `batch_write` 的最大条数
    pub async fn max_batch(&self) -> usize {
        *self.max_batch.lock().await
    }

    async fn enter(&self, op: MockOp) -> RemoteResult<()> {
        *self.calls.lock().await.entry(op).or_insert(0) += 1;
        match self
            .faults
            .lock()
            .await
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found(id: &str) -> RemoteError {
        RemoteError::RecordNotFound {
            backend: "mock".to_string(),
            record_id: id.to_string(),
            raw_message: None,
        }
    }
}

#[async_trait]
impl StoreCollection for MockStoreCollection {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn count(&self) -> RemoteResult<u64> {
        self.enter(MockOp::Count).await?;
        if let Some(Some(stale)) = self.count_readings.lock().await.pop_front() {
            return Ok(stale);
        }
        Ok(self.records.lock().await.len() as u64)
    }

    async fn fetch_all(&self) -> RemoteResult<Vec<StoreRecord>> {
        self.enter(MockOp::FetchAll).await?;
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn fetch_page(&self, page_size: usize, cursor: Option<&str>) -> RemoteResult<RecordPage> {
        self.enter(MockOp::FetchPage).await?;
        let records = self.records.lock().await;
        let page: Vec<StoreRecord> = records
            .values()
            .filter(|r| cursor.is_none_or(|c| r.id.as_str() > c))
            .take(page_size)
            .cloned()
            .collect();
        Ok(RecordPage::new(page, page_size))
    }

    async fn put(&self, record: &StoreRecord) -> RemoteResult<()> {
        self.enter(MockOp::Put).await?;
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, id: &str, patch: &StoreRecordPatch) -> RemoteResult<()> {
        self.enter(MockOp::Update).await?;
        let mut records = self.records.lock().await;
        let current = records.get(id).ok_or_else(|| Self::not_found(id))?;
        // 与远程一致：只覆盖 patch 中出现的字段，不做不变量修正
        let mut next = current.clone();
        for (field, value) in [
            (&mut next.name, &patch.name),
            (&mut next.zipcode, &patch.zipcode),
            (&mut next.prefecture, &patch.prefecture),
            (&mut next.city, &patch.city),
            (&mut next.street_address, &patch.street_address),
            (&mut next.building, &patch.building),
            (&mut next.memo, &patch.memo),
        ] {
            if let Some(v) = value {
                field.clone_from(v);
            }
        }
        if let Some(v) = patch.visited {
            next.visited = v;
        }
        if let Some(v) = &patch.visit_date {
            next.visit_date.clone_from(v);
        }
        if let Some(v) = patch.visit_count {
            next.visit_count = v;
        }
        if let Some(v) = patch.favorite {
            next.favorite = v;
        }
        if let Some(v) = patch.closed {
            next.closed = v;
        }
        records.insert(id.to_string(), next);
        Ok(())
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        self.enter(MockOp::Delete).await?;
        self.records.lock().await.remove(id);
        Ok(())
    }

    async fn batch_write(&self, records: &[StoreRecord]) -> RemoteResult<()> {
        check_batch_size(self.id(), records.len())?;
        self.enter(MockOp::BatchWrite).await?;
        {
            let mut max = self.max_batch.lock().await;
            *max = (*max).max(records.len());
        }
        let mut store = self.records.lock().await;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn batch_delete(&self, ids: &[String]) -> RemoteResult<()> {
        check_batch_size(self.id(), ids.len())?;
        self.enter(MockOp::BatchDelete).await?;
        let mut store = self.records.lock().await;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }
}

// ===== MockLocalCache =====

pub struct MockLocalCache {
    snapshot: Mutex<Option<BackupSnapshot>>,
    metrics: Mutex<Vec<HistoryEntry>>,
    /// 如果 Some，save 时返回此错误
    save_error: Mutex<Option<String>>,
}

impl MockLocalCache {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(None),
            metrics: Mutex::new(Vec::new()),
            save_error: Mutex::new(None),
        }
    }

    pub async fn set_save_error(&self, err: Option<String>) {
        *self.save_error.lock().await = err;
    }

    async fn check_save(&self) -> CoreResult<()> {
        match &*self.save_error.lock().await {
            Some(msg) => Err(CoreError::StorageError(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LocalCache for MockLocalCache {
    async fn load_snapshot(&self) -> CoreResult<Option<BackupSnapshot>> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save_snapshot(&self, snapshot: &BackupSnapshot) -> CoreResult<()> {
        self.check_save().await?;
        *self.snapshot.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load_metrics(&self) -> CoreResult<Vec<HistoryEntry>> {
        Ok(self.metrics.lock().await.clone())
    }

    async fn save_metrics(&self, history: &[HistoryEntry]) -> CoreResult<()> {
        self.check_save().await?;
        *self.metrics.lock().await = history.to_vec();
        Ok(())
    }
}

// ===== 工厂方法 =====

/// 测试用店铺
pub fn test_record(id: &str) -> StoreRecord {
    StoreRecord {
        id: id.to_string(),
        name: format!("Store {id}"),
        zipcode: "150-0001".to_string(),
        prefecture: "東京都".to_string(),
        city: "渋谷区".to_string(),
        ..Default::default()
    }
}

/// `{prefix}-0` .. `{prefix}-{n-1}`
pub fn test_records(prefix: &str, n: usize) -> Vec<StoreRecord> {
    (0..n).map(|i| test_record(&format!("{prefix}-{i}"))).collect()
}

/// 创建测试上下文
pub fn create_test_context(
    records: Vec<StoreRecord>,
) -> (
    Arc<ServiceContext>,
    Arc<MockStoreCollection>,
    Arc<MockLocalCache>,
) {
    let remote = Arc::new(MockStoreCollection::new(records));
    let cache = Arc::new(MockLocalCache::new());
    let ctx = Arc::new(ServiceContext::new(
        Arc::clone(&remote) as Arc<dyn StoreCollection>,
        Arc::clone(&cache) as Arc<dyn LocalCache>,
    ));
    (ctx, remote, cache)
}
