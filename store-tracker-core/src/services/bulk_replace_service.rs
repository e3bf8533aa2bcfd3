//! 整体替换服务（删除全部 → 分块写入 → 计数校验）

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{CoreError, CoreResult};
use crate::retry::{with_retry, RetryPolicy};
use crate::services::ServiceContext;
use crate::types::{OperationKind, OperationMetrics, StoreRecord, MAX_BATCH_SIZE};

/// Default records per fetched delete page.
pub const DEFAULT_PAGE_SIZE: usize = MAX_BATCH_SIZE;
/// Default records per write batch.
pub const DEFAULT_CHUNK_SIZE: usize = MAX_BATCH_SIZE;
/// Default pause after each committed batch.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(200);

/// Tunables for [`BulkReplaceService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkReplaceOptions {
    /// Records fetched per delete page, `1..=500`.
    pub page_size: usize,
    /// Records per write batch, `1..=500`.
    pub chunk_size: usize,
    /// Pause after every committed delete or write batch.
    pub batch_delay: Duration,
    /// Retry policy applied to every remote call.
    pub retry: RetryPolicy,
    /// Additional delete passes when the collection is not empty after the first.
    pub extra_delete_rounds: u32,
    /// Abort instead of warning when records survive every delete pass.
    pub strict_delete_verification: bool,
}

impl Default for BulkReplaceOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            retry: RetryPolicy::default(),
            extra_delete_rounds: 1,
            strict_delete_verification: false,
        }
    }
}

impl BulkReplaceOptions {
    /// Clamps batch sizes into the range the remote store accepts.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.page_size = self.page_size.clamp(1, MAX_BATCH_SIZE);
        self.chunk_size = self.chunk_size.clamp(1, MAX_BATCH_SIZE);
        self
    }
}

/// Progress event emitted while a bulk replace runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkProgress {
    /// Initial remote count is known.
    Counted { before: u64 },
    /// One delete page committed.
    PageDeleted { deleted: usize, total_deleted: usize },
    /// One write chunk committed.
    ChunkWritten { written: usize, total: usize },
    /// All phases done.
    Finished { count_after_write: u64 },
}

/// Receives [`BulkProgress`] events.
pub trait BulkProgressListener: Send + Sync {
    fn on_progress(&self, event: &BulkProgress);
}

impl<F> BulkProgressListener for F
where
    F: Fn(&BulkProgress) + Send + Sync,
{
    fn on_progress(&self, event: &BulkProgress) {
        self(event);
    }
}

/// 整体替换服务
///
/// Replaces the whole remote collection with a supplied record sequence:
///
/// 1. count
/// 2. delete every record page by page (one batch per page)
/// 3. count again, re-running the delete pass up to `extra_delete_rounds` times
/// 4. write the new records in chunks (full overwrite, records without id skipped)
/// 5. count again
///
/// Pages and chunks are processed strictly one after another. Each remote call
/// is retried per [`RetryPolicy`]; the first unrecoverable error aborts the run
/// and may leave the collection partially deleted or written.
///
/// Only one replace runs at a time per service; a concurrent call fails with
/// [`CoreError::OperationInProgress`].
pub struct BulkReplaceService {
    ctx: Arc<ServiceContext>,
    options: BulkReplaceOptions,
    listener: Option<Arc<dyn BulkProgressListener>>,
    in_flight: Mutex<()>,
}

impl BulkReplaceService {
    /// 创建服务实例（默认参数）
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self::with_options(ctx, BulkReplaceOptions::default())
    }

    /// 创建服务实例（自定义参数）
    #[must_use]
    pub fn with_options(ctx: Arc<ServiceContext>, options: BulkReplaceOptions) -> Self {
        Self {
            ctx,
            options: options.normalized(),
            listener: None,
            in_flight: Mutex::new(()),
        }
    }

    /// 设置进度监听器
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn BulkProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn options(&self) -> &BulkReplaceOptions {
        &self.options
    }

    /// Whether a replace is currently running.
    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// 用内置默认数据替换
    pub async fn reset_to_defaults(&self, defaults: &[StoreRecord]) -> CoreResult<OperationMetrics> {
        self.replace_all(OperationKind::Reset, defaults).await
    }

    /// 用备份数据替换
    pub async fn restore_from(&self, records: &[StoreRecord]) -> CoreResult<OperationMetrics> {
        self.replace_all(OperationKind::Restore, records).await
    }

    /// 用导入文件数据替换
    pub async fn import_from(&self, records: &[StoreRecord]) -> CoreResult<OperationMetrics> {
        self.replace_all(OperationKind::Import, records).await
    }

    /// Replaces the whole collection with `records`.
    pub async fn replace_all(
        &self,
        operation: OperationKind,
        records: &[StoreRecord],
    ) -> CoreResult<OperationMetrics> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            log::warn!("[bulk] {operation} rejected: another operation is running");
            return Err(CoreError::OperationInProgress);
        };

        let started = Instant::now();
        log::info!("[bulk] {operation} started with {} records", records.len());

        // 1. 初始计数
        let count_before = self.count().await?;
        self.emit(&BulkProgress::Counted {
            before: count_before,
        });

        // 2-3. 删除全部并校验
        let count_after_delete = self.delete_phase().await?;

        // 4. 分块写入
        let (valid, skipped): (Vec<&StoreRecord>, Vec<&StoreRecord>) =
            records.iter().partition(|r| r.has_id());
        if !skipped.is_empty() {
            log::warn!("[bulk] skipping {} records without id", skipped.len());
        }
        let valid: Vec<StoreRecord> = valid.into_iter().cloned().collect();
        self.write_phase(&valid).await?;

        // 5. 最终计数
        let count_after_write = self.count().await?;
        self.emit(&BulkProgress::Finished { count_after_write });

        let metrics = OperationMetrics {
            operation,
            count_before,
            count_after_delete,
            count_written: valid.len() as u64,
            count_skipped: skipped.len() as u64,
            count_after_write,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            timestamp: Utc::now(),
        };

        if count_after_write == metrics.count_written {
            log::info!(
                "[bulk] {operation} finished: before={count_before} after_delete={count_after_delete} written={} after_write={count_after_write} ({}ms)",
                metrics.count_written,
                metrics.duration_ms
            );
        } else {
            log::warn!(
                "[bulk] {operation} finished with count mismatch: written={} after_write={count_after_write}",
                metrics.count_written
            );
        }

        Ok(metrics)
    }

    /// Runs delete passes until the count reads zero or the rounds run out.
    /// Returns the last observed count.
    async fn delete_phase(&self) -> CoreResult<u64> {
        let max_rounds = self.options.extra_delete_rounds + 1;
        let mut round = 1;

        loop {
            let deleted = self.delete_all().await?;
            let remaining = self.count().await?;
            log::info!("[bulk] delete round {round}: {deleted} deleted, {remaining} remaining");

            if remaining == 0 {
                return Ok(0);
            }
            if round >= max_rounds {
                if self.options.strict_delete_verification {
                    log::error!("[bulk] {remaining} records remain after {round} delete rounds");
                    return Err(CoreError::DeleteVerificationFailed {
                        remaining,
                        rounds: round,
                    });
                }
                log::warn!(
                    "[bulk] {remaining} records remain after {round} delete rounds, continuing"
                );
                return Ok(remaining);
            }

            log::warn!("[bulk] {remaining} records remain after delete round {round}, retrying");
            round += 1;
        }
    }

    /// One delete pass: fetch the first page, delete it, repeat until a page is empty.
    ///
    /// No cursor is used; each committed delete shrinks the collection, so the
    /// next fetch from the start returns the following records.
    async fn delete_all(&self) -> CoreResult<usize> {
        let collection = self.ctx.collection();
        let retry = &self.options.retry;
        let page_size = self.options.page_size;
        let mut total_deleted = 0;

        loop {
            let page = with_retry(retry, "fetch_page", move || {
                collection.fetch_page(page_size, None)
            })
            .await?;
            if page.records.is_empty() {
                break;
            }

            let ids: Vec<String> = page.records.into_iter().map(|r| r.id).collect();
            let batch = ids.as_slice();
            with_retry(retry, "batch_delete", move || collection.batch_delete(batch)).await?;

            total_deleted += ids.len();
            log::debug!("[bulk] deleted {} records ({total_deleted} total)", ids.len());
            self.emit(&BulkProgress::PageDeleted {
                deleted: ids.len(),
                total_deleted,
            });
            self.pause().await;
        }

        Ok(total_deleted)
    }

    async fn write_phase(&self, records: &[StoreRecord]) -> CoreResult<()> {
        let collection = self.ctx.collection();
        let retry = &self.options.retry;
        let total = records.len();
        let mut written = 0;

        for chunk in records.chunks(self.options.chunk_size) {
            with_retry(retry, "batch_write", move || collection.batch_write(chunk)).await?;

            written += chunk.len();
            log::debug!("[bulk] wrote {written}/{total} records");
            self.emit(&BulkProgress::ChunkWritten { written, total });
            self.pause().await;
        }

        Ok(())
    }

    async fn count(&self) -> CoreResult<u64> {
        let collection = self.ctx.collection();
        Ok(with_retry(&self.options.retry, "count", move || collection.count()).await?)
    }

    async fn pause(&self) {
        if !self.options.batch_delay.is_zero() {
            tokio::time::sleep(self.options.batch_delay).await;
        }
    }

    fn emit(&self, event: &BulkProgress) {
        if let Some(listener) = &self.listener {
            listener.on_progress(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_context, test_record, test_records, MockOp};
    use std::sync::Mutex as StdMutex;
    use store_tracker_remote::RemoteError;

    fn service(ctx: Arc<ServiceContext>) -> BulkReplaceService {
        BulkReplaceService::new(ctx)
    }

    fn unavailable() -> RemoteError {
        RemoteError::Unavailable {
            backend: "mock".into(),
            raw_message: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reset_replaces_three_with_two_defaults() {
        let (ctx, remote, _) = create_test_context(test_records("old", 3));
        let defaults = test_records("default", 2);

        let metrics = service(ctx).reset_to_defaults(&defaults).await.unwrap();

        assert_eq!(metrics.operation, OperationKind::Reset);
        assert_eq!(metrics.count_before, 3);
        assert_eq!(metrics.count_after_delete, 0);
        assert_eq!(metrics.count_written, 2);
        assert_eq!(metrics.count_after_write, 2);
        assert!(metrics.is_verified());
        assert_eq!(remote.ids().await, vec!["default-0", "default-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn replace_is_idempotent() {
        let (ctx, _, _) = create_test_context(test_records("old", 7));
        let svc = service(ctx);
        let records = test_records("new", 4);

        let first = svc.import_from(&records).await.unwrap();
        let second = svc.import_from(&records).await.unwrap();

        assert_eq!(first.count_after_write, 4);
        assert_eq!(second.count_before, 4);
        assert_eq!(second.count_after_write, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn records_without_id_are_skipped() {
        let (ctx, remote, _) = create_test_context(Vec::new());
        let no_id = StoreRecord {
            name: "no id".into(),
            ..Default::default()
        };

        let metrics = service(ctx)
            .import_from(&[test_record("a"), no_id])
            .await
            .unwrap();

        assert_eq!(metrics.count_written, 1);
        assert_eq!(metrics.count_skipped, 1);
        assert_eq!(metrics.count_after_write, 1);
        assert_eq!(remote.ids().await, vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_paging_issues_ceil_n_over_p_cycles() {
        let (ctx, remote, _) = create_test_context(test_records("r", 1201));

        let metrics = service(ctx).restore_from(&[]).await.unwrap();

        assert_eq!(metrics.count_after_delete, 0);
        // 3 pages of data + 1 empty page ends the pass
        assert_eq!(remote.calls(MockOp::BatchDelete).await, 3);
        assert_eq!(remote.calls(MockOp::FetchPage).await, 4);
        assert_eq!(remote.calls(MockOp::BatchWrite).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_are_chunked_at_batch_ceiling() {
        let (ctx, remote, _) = create_test_context(Vec::new());
        let records = test_records("w", 1001);

        let metrics = service(ctx).import_from(&records).await.unwrap();

        assert_eq!(remote.calls(MockOp::BatchWrite).await, 3);
        assert_eq!(remote.max_batch().await, 500);
        assert_eq!(metrics.count_after_write, 1001);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_delete_failure_is_retried() {
        let (ctx, remote, _) = create_test_context(test_records("r", 10));
        remote.fail_next(MockOp::BatchDelete, unavailable()).await;
        remote.fail_next(MockOp::BatchDelete, unavailable()).await;

        let metrics = service(ctx).import_from(&test_records("n", 2)).await.unwrap();

        assert_eq!(metrics.count_after_write, 2);
        assert_eq!(remote.calls(MockOp::BatchDelete).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_write_failure_aborts_after_delete() {
        let (ctx, remote, _) = create_test_context(test_records("r", 5));
        remote
            .fail_next(
                MockOp::BatchWrite,
                RemoteError::PermissionDenied {
                    backend: "mock".into(),
                    raw_message: None,
                },
            )
            .await;

        let result = service(ctx).import_from(&test_records("n", 3)).await;

        assert!(matches!(
            result,
            Err(CoreError::Remote(RemoteError::PermissionDenied { .. }))
        ));
        assert_eq!(remote.calls(MockOp::BatchWrite).await, 1);
        // no rollback: the delete phase already ran
        assert!(remote.ids().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_count_triggers_extra_delete_round() {
        let (ctx, remote, _) = create_test_context(test_records("r", 4));
        // count_before reads the real value, then one lagging read after the first pass
        remote.push_count_reading(None).await;
        remote.push_count_reading(Some(2)).await;

        let metrics = service(ctx).reset_to_defaults(&test_records("d", 1)).await.unwrap();

        assert_eq!(metrics.count_after_delete, 0);
        // pass 1: data page + empty page, pass 2: empty page
        assert_eq!(remote.calls(MockOp::FetchPage).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn nonzero_after_delete_warns_and_continues() {
        let (ctx, remote, _) = create_test_context(test_records("r", 4));
        remote.push_count_reading(None).await;
        remote.push_count_reading(Some(2)).await;
        remote.push_count_reading(Some(1)).await;

        let metrics = service(ctx).reset_to_defaults(&test_records("d", 1)).await.unwrap();

        assert_eq!(metrics.count_after_delete, 1);
        assert_eq!(metrics.count_written, 1);
        assert!(!metrics.is_verified());
    }

    #[tokio::test(start_paused = true)]
    async fn strict_verification_aborts_before_writing() {
        let (ctx, remote, _) = create_test_context(test_records("r", 4));
        remote.push_count_reading(None).await;
        remote.push_count_reading(Some(2)).await;
        remote.push_count_reading(Some(2)).await;

        let svc = BulkReplaceService::with_options(
            ctx,
            BulkReplaceOptions {
                strict_delete_verification: true,
                ..Default::default()
            },
        );
        let result = svc.reset_to_defaults(&test_records("d", 1)).await;

        assert!(matches!(
            result,
            Err(CoreError::DeleteVerificationFailed {
                remaining: 2,
                rounds: 2
            })
        ));
        assert_eq!(remote.calls(MockOp::BatchWrite).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_replace_is_rejected() {
        let (ctx, _, _) = create_test_context(test_records("r", 3));
        let svc = service(ctx);
        let records = test_records("n", 2);

        let (first, second) = tokio::join!(svc.import_from(&records), async {
            tokio::task::yield_now().await;
            svc.restore_from(&records).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(CoreError::OperationInProgress)));
        assert!(!svc.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn progress_events_are_reported_in_order() {
        let (ctx, _, _) = create_test_context(test_records("r", 3));
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let svc = BulkReplaceService::with_options(
            ctx,
            BulkReplaceOptions {
                page_size: 2,
                chunk_size: 2,
                ..Default::default()
            },
        )
        .with_listener(Arc::new(move |e: &BulkProgress| {
            sink.lock().unwrap().push(e.clone());
        }));

        svc.import_from(&test_records("n", 3)).await.unwrap();

        let events = events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                BulkProgress::Counted { before: 3 },
                BulkProgress::PageDeleted {
                    deleted: 2,
                    total_deleted: 2
                },
                BulkProgress::PageDeleted {
                    deleted: 1,
                    total_deleted: 3
                },
                BulkProgress::ChunkWritten {
                    written: 2,
                    total: 3
                },
                BulkProgress::ChunkWritten {
                    written: 3,
                    total: 3
                },
                BulkProgress::Finished {
                    count_after_write: 3
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duration_covers_batch_delays() {
        let (ctx, _, _) = create_test_context(test_records("r", 2));
        let metrics = service(ctx).import_from(&test_records("n", 2)).await.unwrap();
        // one delete batch + one write batch, 200ms each
        assert!(metrics.duration_ms >= 400, "duration {}", metrics.duration_ms);
    }

    #[test]
    fn options_are_clamped() {
        let options = BulkReplaceOptions {
            page_size: 0,
            chunk_size: 10_000,
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.page_size, 1);
        assert_eq!(options.chunk_size, 500);
    }
}
