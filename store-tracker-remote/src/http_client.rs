//! Generic HTTP client tools
//!
//! Reusable request/response handling shared by remote backends.
//! Each backend still builds its own `RequestBuilder` (URL, auth, body).
//!
//! # design principles
//! - **One physical request per call** - no retry here; retry is composed by callers
//! - **Unified and universal HTTP processing flow** - sending requests, logging, and reading responses
//! - **Flexible response parsing** - Provides tool functions but does not limit parsing methods

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::RemoteError;
use crate::utils::log_sanitizer::{redact_secrets, truncate_for_log};

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns response text
    ///
    /// Unified processing: sending requests, logging, transport-level error classification.
    ///
    /// # Arguments
    /// * `request_builder` - configured request constructor (including URL, headers, body, etc.)
    /// * `backend_name` - backend name (for logging)
    /// * `method_name` - request method name (such as "GET", "POST", used for logs)
    /// * `url_or_action` - URL or action name (for logging)
    ///
    /// # Returns
    /// * `Ok((status_code, response_text))` - for every status except the ones below
    /// * `Err(RemoteError::NetworkError | Timeout)` - transport failure, HTTP 502/504
    /// * `Err(RemoteError::Unavailable)` - HTTP 503
    /// * `Err(RemoteError::RateLimited)` - HTTP 429
    pub async fn execute_request(
        request_builder: RequestBuilder,
        backend_name: &str,
        method_name: &str,
        url_or_action: &str,
    ) -> Result<(u16, String), RemoteError> {
        log::debug!("[{backend_name}] {method_name} {url_or_action}");

        // 传输层错误消息里带完整 URL（含 ?key=），记录前先脱敏
        let response = request_builder.send().await.map_err(|e| {
            let detail = redact_secrets(&e.to_string());
            if e.is_timeout() {
                RemoteError::Timeout {
                    backend: backend_name.to_string(),
                    detail,
                }
            } else {
                RemoteError::NetworkError {
                    backend: backend_name.to_string(),
                    detail,
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{backend_name}] Response Status: {status_code}");

        // Retry-After 只在消费响应体之前可读
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        if matches!(status_code, 429 | 502 | 503 | 504) {
            let body = truncate_for_log(&response.text().await.unwrap_or_default());
            log::warn!("[{backend_name}] HTTP {status_code} from {url_or_action}");
            return Err(match status_code {
                429 => RemoteError::RateLimited {
                    backend: backend_name.to_string(),
                    retry_after,
                    raw_message: Some(body),
                },
                503 => RemoteError::Unavailable {
                    backend: backend_name.to_string(),
                    raw_message: Some(body),
                },
                _ => RemoteError::NetworkError {
                    backend: backend_name.to_string(),
                    detail: format!("HTTP {status_code}: {body}"),
                },
            });
        }

        // Read response body
        let response_text = response
            .text()
            .await
            .map_err(|e| RemoteError::NetworkError {
                backend: backend_name.to_string(),
                detail: format!("Failed to read response body: {}", redact_secrets(&e.to_string())),
            })?;

        log::debug!(
            "[{backend_name}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    /// Parse JSON response
    ///
    /// # Type Parameters
    /// * `T` - target type
    ///
    /// # Returns
    /// * `Ok(T)` - successfully parsed
    /// * `Err(RemoteError::ParseError)` - parsing failed
    pub fn parse_json<T>(response_text: &str, backend_name: &str) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[{backend_name}] JSON parse failed: {e}");
            log::error!(
                "[{backend_name}] Raw response: {}",
                truncate_for_log(response_text)
            );
            RemoteError::ParseError {
                backend: backend_name.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// Serialize a request body, mapping failures to `SerializationError`.
    pub fn to_json_body<T>(body: &T, backend_name: &str) -> Result<String, RemoteError>
    where
        T: serde::Serialize,
    {
        serde_json::to_string(body).map_err(|e| RemoteError::SerializationError {
            backend: backend_name.to_string(),
            detail: e.to_string(),
        })
    }
}

/// Whether the status code denotes success.
pub fn is_success(status_code: u16) -> bool {
    (200..300).contains(&status_code)
}
