//! Firestore HTTP 请求方法

use reqwest::RequestBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{RemoteError, Result};
use crate::http_client::{HttpUtils, is_success};
use crate::traits::{ErrorContext, RawApiError, RemoteErrorMapper};
use crate::utils::log_sanitizer::truncate_for_log;

use super::FirestoreCollection;
use super::types::ErrorEnvelope;

impl FirestoreCollection {
    /// 附加 bearer token 与 API key
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.config.id_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match &self.config.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    /// 执行请求并解析响应
    ///
    /// 非 2xx 响应按 Google 错误包解析并映射为 [`RemoteError`]。
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        action: &str,
        context: ErrorContext,
    ) -> Result<T> {
        let request = self.authorize(request);
        let (status, text) =
            HttpUtils::execute_request(request, self.backend_name(), method, action)
                .await
                .map_err(|e| self.reclassify(e))?;

        if !is_success(status) {
            let err = self.error_from_body(status, &text, context);
            if err.is_expected() {
                log::warn!("[firestore] {method} {action} failed: {err}");
            } else {
                log::error!("[firestore] {method} {action} failed: {err}");
            }
            return Err(err);
        }

        let body = if text.trim().is_empty() { "null" } else { &text };
        HttpUtils::parse_json(body, self.backend_name())
    }

    /// 执行带 JSON 请求体的请求
    pub(crate) async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: &B,
        method: &str,
        action: &str,
        context: ErrorContext,
    ) -> Result<T> {
        let body = HttpUtils::to_json_body(body, self.backend_name())?;
        let request = request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request, method, action, context).await
    }

    /// 429 响应体提到 quota 时是配额耗尽，不可重试
    fn reclassify(&self, err: RemoteError) -> RemoteError {
        match err {
            RemoteError::RateLimited {
                raw_message: Some(message),
                ..
            } if message.to_lowercase().contains("quota") => RemoteError::QuotaExceeded {
                backend: self.backend_name().to_string(),
                raw_message: Some(message),
            },
            other => other,
        }
    }

    /// 解析错误响应；`runQuery` 等流式接口会把错误包在数组里
    fn error_from_body(&self, status: u16, text: &str, context: ErrorContext) -> RemoteError {
        let envelope = serde_json::from_str::<ErrorEnvelope>(text).ok().or_else(|| {
            serde_json::from_str::<Vec<ErrorEnvelope>>(text)
                .ok()
                .and_then(|list| list.into_iter().next())
        });

        let raw = match envelope {
            Some(ErrorEnvelope { error }) => {
                let http_status = if error.code == 0 { status } else { error.code };
                RawApiError::with_status(http_status, error.status, error.message)
            }
            None => RawApiError::with_status(status, None, truncate_for_log(text)),
        };
        self.map_error(raw, context)
    }
}
