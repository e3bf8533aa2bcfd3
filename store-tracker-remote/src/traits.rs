use async_trait::async_trait;

use crate::error::{RemoteError, Result};
use crate::types::{RecordPage, StoreRecord, StoreRecordPatch};

/// 原始 API 错误（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// 错误码（gRPC status 名称，如 `UNAVAILABLE`）
    pub code: Option<String>,
    /// HTTP 状态码
    pub http_status: Option<u16>,
    /// 原始错误消息
    pub message: String,
}

impl RawApiError {
    #[allow(dead_code)]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            http_status: None,
            message: message.into(),
        }
    }

    pub fn with_status(
        http_status: u16,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            http_status: Some(http_status),
            message: message.into(),
        }
    }
}

/// 错误上下文信息（内部使用）
/// 用于在映射错误时提供额外信息
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// 记录 ID（用于 `RecordNotFound` 等错误）
    pub record_id: Option<String>,
    /// 出错的参数名（用于 `InvalidParameter`）
    pub param: Option<String>,
}

impl ErrorContext {
    pub fn for_record(id: &str) -> Self {
        Self {
            record_id: Some(id.to_string()),
            param: None,
        }
    }
}

/// 后端错误映射 Trait（内部使用）
/// 各后端实现此 trait 以将原始 API 错误映射到统一错误类型
pub(crate) trait RemoteErrorMapper {
    /// 返回后端标识符
    fn backend_name(&self) -> &'static str;

    /// 将原始 API 错误映射到统一错误类型
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> RemoteError;

    /// 快捷方法：解析错误
    fn parse_error(&self, detail: impl ToString) -> RemoteError {
        RemoteError::ParseError {
            backend: self.backend_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// 快捷方法：未知错误（fallback）
    fn unknown_error(&self, raw: RawApiError) -> RemoteError {
        RemoteError::Unknown {
            backend: self.backend_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// Remote store collection.
///
/// One physical operation per call. Implementations must **not** retry
/// internally; callers compose retry around each call site.
#[async_trait]
pub trait StoreCollection: Send + Sync {
    /// Backend identifier.
    fn id(&self) -> &'static str;

    /// Total number of records, via a server-side aggregate.
    async fn count(&self) -> Result<u64>;

    /// Every record in the collection.
    async fn fetch_all(&self) -> Result<Vec<StoreRecord>>;

    /// Up to `page_size` records ordered by id, starting after `cursor`.
    async fn fetch_page(&self, page_size: usize, cursor: Option<&str>) -> Result<RecordPage>;

    /// Create or fully overwrite one record.
    async fn put(&self, record: &StoreRecord) -> Result<()>;

    /// Update the given fields of an existing record.
    async fn update(&self, id: &str, patch: &StoreRecordPatch) -> Result<()>;

    /// Delete one record.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Atomically overwrite up to [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE) records (no merge).
    ///
    /// 默认实现逐条调用 `put()`，不具备原子性。
    /// 后端可覆写以使用原生批量提交。
    async fn batch_write(&self, records: &[StoreRecord]) -> Result<()> {
        check_batch_size(self.id(), records.len())?;
        for record in records {
            self.put(record).await?;
        }
        Ok(())
    }

    /// Atomically delete up to [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE) records.
    ///
    /// 默认实现逐条调用 `delete()`，不具备原子性。
    async fn batch_delete(&self, ids: &[String]) -> Result<()> {
        check_batch_size(self.id(), ids.len())?;
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }
}

/// Reject batches above the backend ceiling before sending anything.
pub fn check_batch_size(backend: &str, len: usize) -> Result<()> {
    if len > crate::MAX_BATCH_SIZE {
        return Err(RemoteError::InvalidParameter {
            backend: backend.to_string(),
            param: "batch".to_string(),
            detail: format!(
                "{len} operations exceed the batch ceiling of {}",
                crate::MAX_BATCH_SIZE
            ),
        });
    }
    Ok(())
}
