//! 单条店铺操作与列表统计

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::{CoreError, CoreResult};
use crate::retry::{with_retry, RetryPolicy};
use crate::services::{MetricsRecorder, ServiceContext};
use crate::types::{
    NewStore, PrefectureStats, RecordAction, RecordOperationLog, RegionSummary, StoreFilter,
    StoreRecord, StoreRecordPatch,
};
use crate::utils::region::{compare_prefectures, is_known_prefecture, percentage, zip_key};

/// 店铺服务
///
/// With a recorder attached, every successful add / update / delete is logged
/// into the shared operation history and persisted to the local cache.
pub struct StoreService {
    ctx: Arc<ServiceContext>,
    retry: RetryPolicy,
    recorder: Option<Arc<MetricsRecorder>>,
}

impl StoreService {
    /// 创建服务实例
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self::with_retry(ctx, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_retry(ctx: Arc<ServiceContext>, retry: RetryPolicy) -> Self {
        Self {
            ctx,
            retry,
            recorder: None,
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<MetricsRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    async fn log_operation(&self, action: RecordAction, store: &str, started: Instant) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let entry = RecordOperationLog::new(action, store, duration_ms);
        if let Err(e) = recorder
            .record_persisted(entry, self.ctx.local_cache.as_ref())
            .await
        {
            log::error!("Failed to save operation history: {e}");
        }
    }

    /// 读取全部店铺
    pub async fn list_stores(&self) -> CoreResult<Vec<StoreRecord>> {
        let collection = self.ctx.collection();
        Ok(with_retry(&self.retry, "fetch_all", move || collection.fetch_all()).await?)
    }

    /// 远程店铺数
    pub async fn count(&self) -> CoreResult<u64> {
        let collection = self.ctx.collection();
        Ok(with_retry(&self.retry, "count", move || collection.count()).await?)
    }

    /// 按 ID 查找
    pub async fn find(&self, id: &str) -> CoreResult<StoreRecord> {
        self.list_stores()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::RecordNotFound(id.to_string()))
    }

    /// 新增店铺
    pub async fn add_store(&self, input: NewStore) -> CoreResult<StoreRecord> {
        for (field, value) in [
            ("name", &input.name),
            ("prefecture", &input.prefecture),
            ("city", &input.city),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationError(format!("{field} is required")));
            }
        }

        let record = StoreRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            zipcode: input.zipcode.trim().to_string(),
            prefecture: input.prefecture.trim().to_string(),
            city: input.city.trim().to_string(),
            street_address: input.street_address.trim().to_string(),
            building: input.building.trim().to_string(),
            visited: false,
            visit_date: None,
            visit_count: 0,
            favorite: input.favorite,
            closed: false,
            memo: input.memo,
        }
        .normalized();
        record.validate()?;

        let started = Instant::now();
        let collection = self.ctx.collection();
        let target = &record;
        with_retry(&self.retry, "put", move || collection.put(target)).await?;

        log::info!("Store added: {} ({})", record.name, record.id);
        self.log_operation(RecordAction::Add, &record.name, started).await;
        Ok(record)
    }

    /// 部分更新，只发送变化的字段
    ///
    /// Returns the resulting record with the visit invariant applied.
    pub async fn update_store(
        &self,
        current: &StoreRecord,
        patch: &StoreRecordPatch,
    ) -> CoreResult<StoreRecord> {
        let next = patch.apply_to(current);
        next.validate()?;

        let diff = StoreRecordPatch::between(current, &next);
        if diff.is_empty() {
            return Ok(next);
        }

        let started = Instant::now();
        let collection = self.ctx.collection();
        let id = current.id.as_str();
        let changes = &diff;
        with_retry(&self.retry, "update", move || collection.update(id, changes)).await?;

        log::debug!("Store updated: {id} {:?}", diff.field_paths());
        let label = if next.name.trim().is_empty() { id } else { next.name.as_str() };
        self.log_operation(RecordAction::Update, label, started).await;
        Ok(next)
    }

    /// 标记已访问（访问次数 +1，日期默认今天）
    pub async fn mark_visited(
        &self,
        current: &StoreRecord,
        date: Option<String>,
    ) -> CoreResult<StoreRecord> {
        let visit_count = if current.visited {
            current.visit_count.saturating_add(1)
        } else {
            1
        };
        let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        let patch = StoreRecordPatch {
            visited: Some(true),
            visit_count: Some(visit_count),
            visit_date: Some(Some(date)),
            ..Default::default()
        };
        self.update_store(current, &patch).await
    }

    /// 取消访问标记（次数与日期一并清空）
    pub async fn unmark_visited(&self, current: &StoreRecord) -> CoreResult<StoreRecord> {
        let patch = StoreRecordPatch {
            visited: Some(false),
            ..Default::default()
        };
        self.update_store(current, &patch).await
    }

    /// 标记闭店
    pub async fn mark_closed(&self, current: &StoreRecord) -> CoreResult<StoreRecord> {
        let patch = StoreRecordPatch {
            closed: Some(true),
            ..Default::default()
        };
        self.update_store(current, &patch).await
    }

    /// 删除店铺（仅限已闭店）
    pub async fn delete_store(&self, record: &StoreRecord) -> CoreResult<()> {
        if !record.closed {
            return Err(CoreError::DeleteNotAllowed(record.id.clone()));
        }

        let started = Instant::now();
        let collection = self.ctx.collection();
        let id = record.id.as_str();
        with_retry(&self.retry, "delete", move || collection.delete(id)).await?;

        log::info!("Store deleted: {id}");
        self.log_operation(RecordAction::Delete, id, started).await;
        Ok(())
    }

    /// 过滤并排序（都道府県コード順 → 郵便番号順）
    pub fn search(records: &[StoreRecord], filter: &StoreFilter) -> Vec<StoreRecord> {
        let text = filter
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let mut hits: Vec<StoreRecord> = records
            .iter()
            .filter(|r| filter.prefecture.as_ref().is_none_or(|p| &r.prefecture == p))
            .filter(|r| filter.city.as_ref().is_none_or(|c| &r.city == c))
            .filter(|r| !filter.visited_only || r.visited)
            .filter(|r| !filter.favorite_only || r.favorite)
            .filter(|r| filter.show_closed || !r.closed)
            .filter(|r| {
                text.as_ref().is_none_or(|t| {
                    [&r.name, &r.city, &r.street_address]
                        .iter()
                        .any(|field| field.to_lowercase().contains(t.as_str()))
                })
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| {
            compare_prefectures(&a.prefecture, &b.prefecture)
                .then_with(|| zip_key(&a.zipcode).cmp(&zip_key(&b.zipcode)))
        });
        hits
    }

    /// 访问进度统计（不含闭店）
    pub fn region_summary(records: &[StoreRecord]) -> RegionSummary {
        let open: Vec<&StoreRecord> = records.iter().filter(|r| !r.closed).collect();
        let visited_open = open.iter().filter(|r| r.visited).count();

        let mut by_prefecture: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for r in open.iter().filter(|r| is_known_prefecture(&r.prefecture)) {
            let entry = by_prefecture.entry(r.prefecture.as_str()).or_default();
            entry.1 += 1;
            if r.visited {
                entry.0 += 1;
            }
        }

        let mut prefectures: Vec<PrefectureStats> = by_prefecture
            .into_iter()
            .map(|(prefecture, (visited, total))| PrefectureStats {
                prefecture: prefecture.to_string(),
                visited,
                total,
                rate: percentage(visited, total),
            })
            .collect();
        prefectures.sort_by(|a, b| compare_prefectures(&a.prefecture, &b.prefecture));

        RegionSummary {
            open_total: open.len(),
            visited_open,
            visited_rate: percentage(visited_open, open.len()),
            prefectures,
        }
    }

    /// 出现过的都道府県（コード順）
    pub fn prefectures_in(records: &[StoreRecord]) -> Vec<String> {
        let mut names: Vec<String> = records
            .iter()
            .filter(|r| is_known_prefecture(&r.prefecture))
            .map(|r| r.prefecture.clone())
            .collect();
        names.sort_by(|a, b| compare_prefectures(a, b));
        names.dedup();
        names
    }

    /// 某都道府県内的市区町村（按最小邮编排序）
    pub fn cities_in(records: &[StoreRecord], prefecture: &str) -> Vec<String> {
        let mut lowest: BTreeMap<&str, u64> = BTreeMap::new();
        for r in records
            .iter()
            .filter(|r| r.prefecture == prefecture && !r.city.trim().is_empty())
        {
            let zip = zip_key(&r.zipcode);
            lowest
                .entry(r.city.as_str())
                .and_modify(|z| *z = (*z).min(zip))
                .or_insert(zip);
        }

        let mut cities: Vec<(&str, u64)> = lowest.into_iter().collect();
        cities.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        cities.into_iter().map(|(city, _)| city.to_string()).collect()
    }
}
