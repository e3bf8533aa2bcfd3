//! 后端公共工具函数

use std::time::Duration;

use reqwest::Client;

use crate::error::{RemoteError, Result};

// ============ HTTP Client ============

/// 默认连接超时（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// 默认请求超时（秒）
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 创建带超时配置的 HTTP Client
pub fn create_http_client(backend: &str) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| RemoteError::NetworkError {
            backend: backend.to_string(),
            detail: format!("Failed to create HTTP client: {e}"),
        })
}

// ============ 文档路径处理 ============

/// 去掉 URL 末尾的斜杠
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// 取文档资源名的最后一段作为记录 ID
/// 如: "projects/p/databases/(default)/documents/stores/abc" -> "abc"
pub fn document_id_from_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// 模拟器地址补全协议头
/// 如: "localhost:8080" -> "http://localhost:8080/v1"
pub fn emulator_base_url(host: &str) -> String {
    let host = normalize_base_url(host);
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/v1")
    } else {
        format!("http://{host}/v1")
    }
}
