use serde::{Deserialize, Serialize};

/// Markers that identify a transient failure when the backend only gives us free text.
///
/// Matched case-insensitively against the raw code and message of
/// [`RemoteError::Unknown`]. `bloom` covers the flaky bloom-filter index
/// reports Firestore occasionally surfaces during heavy deletes.
const TRANSIENT_MARKERS: &[&str] = &[
    "unavailable",
    "deadline",
    "aborted",
    "transient",
    "retry",
    "network",
    "bloom",
];

/// Unified error type for all remote collection operations.
///
/// Each variant includes a `backend` field identifying which backend produced the error,
/// plus variant-specific context. All variants are serializable for structured error reporting.
///
/// # Transient Errors
///
/// The following variants represent failures that may succeed on retry:
/// - [`NetworkError`](Self::NetworkError): network connectivity issues
/// - [`Timeout`](Self::Timeout): request or server deadline exceeded
/// - [`Unavailable`](Self::Unavailable): backend temporarily unavailable
/// - [`Aborted`](Self::Aborted): contention, the commit was aborted
/// - [`RateLimited`](Self::RateLimited): write rate limit exceeded
///
/// The client itself never retries; see [`is_transient`](Self::is_transient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum RemoteError {
    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    NetworkError {
        /// Backend that produced the error.
        backend: String,
        /// Error details.
        detail: String,
    },

    /// The request or the server-side deadline timed out.
    Timeout {
        /// Backend that produced the error.
        backend: String,
        /// Error details.
        detail: String,
    },

    /// The service is temporarily unavailable.
    Unavailable {
        /// Backend that produced the error.
        backend: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The operation was aborted, typically due to a concurrency conflict.
    Aborted {
        /// Backend that produced the error.
        backend: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The write rate limit has been exceeded (HTTP 429).
    ///
    /// Unlike [`QuotaExceeded`](Self::QuotaExceeded), the request should succeed after waiting.
    RateLimited {
        /// Backend that produced the error.
        backend: String,
        /// Suggested wait time in seconds, if provided.
        retry_after: Option<u64>,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The bearer token is missing, invalid or expired.
    Unauthenticated {
        /// Backend that produced the error.
        backend: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The signed-in principal lacks permission for the requested operation.
    PermissionDenied {
        /// Backend that produced the error.
        backend: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// A request parameter is invalid.
    InvalidParameter {
        /// Backend that produced the error.
        backend: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// The addressed record does not exist.
    RecordNotFound {
        /// Backend that produced the error.
        backend: String,
        /// ID of the record that was not found.
        record_id: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// A precondition failed (missing index, document state mismatch).
    FailedPrecondition {
        /// Backend that produced the error.
        backend: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The project's quota has been exhausted.
    ///
    /// Unlike [`RateLimited`](Self::RateLimited), this is not a transient condition.
    QuotaExceeded {
        /// Backend that produced the error.
        backend: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// Failed to parse the backend's response.
    ParseError {
        /// Backend that produced the error.
        backend: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Backend that produced the error.
        backend: String,
        /// Details about the serialization failure.
        detail: String,
    },

    /// An unrecognized error from the backend.
    Unknown {
        /// Backend that produced the error.
        backend: String,
        /// Raw error code, if available.
        raw_code: Option<String>,
        /// Raw error message.
        raw_message: String,
    },
}

impl RemoteError {
    /// 是否为预期行为（用户输入、资源不存在等），用于日志分级。
    ///
    /// 返回 `true` 时应使用 `warn` 级别，`false` 时使用 `error` 级别。
    /// **新增变体时请同步更新此方法。**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. }
                | Self::PermissionDenied { .. }
                | Self::InvalidParameter { .. }
                | Self::RecordNotFound { .. }
                | Self::FailedPrecondition { .. }
                | Self::QuotaExceeded { .. }
        )
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Structured variants are classified directly; [`Unknown`](Self::Unknown)
    /// falls back to matching its raw code and message against known transient markers.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::Unavailable { .. }
            | Self::Aborted { .. }
            | Self::RateLimited { .. } => true,
            Self::Unknown {
                raw_code,
                raw_message,
                ..
            } => {
                let haystack = format!(
                    "{} {}",
                    raw_code.as_deref().unwrap_or_default(),
                    raw_message
                )
                .to_lowercase();
                TRANSIENT_MARKERS.iter().any(|m| haystack.contains(m))
            }
            _ => false,
        }
    }

    /// Suggested wait before the next attempt, when the backend supplied one.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { backend, detail } => {
                write!(f, "[{backend}] Network error: {detail}")
            }
            Self::Timeout { backend, detail } => {
                write!(f, "[{backend}] Deadline exceeded: {detail}")
            }
            Self::Unavailable {
                backend,
                raw_message,
            } => write_with_message(f, backend, "Service unavailable", raw_message.as_deref()),
            Self::Aborted {
                backend,
                raw_message,
            } => write_with_message(f, backend, "Operation aborted", raw_message.as_deref()),
            Self::RateLimited {
                backend,
                retry_after,
                ..
            } => {
                if let Some(secs) = retry_after {
                    write!(f, "[{backend}] Rate limited (retry after {secs}s)")
                } else {
                    write!(f, "[{backend}] Rate limited")
                }
            }
            Self::Unauthenticated {
                backend,
                raw_message,
            } => write_with_message(f, backend, "Unauthenticated", raw_message.as_deref()),
            Self::PermissionDenied {
                backend,
                raw_message,
            } => write_with_message(f, backend, "Permission denied", raw_message.as_deref()),
            Self::InvalidParameter {
                backend,
                param,
                detail,
            } => {
                write!(f, "[{backend}] Invalid parameter '{param}': {detail}")
            }
            Self::RecordNotFound {
                backend,
                record_id,
                ..
            } => {
                write!(f, "[{backend}] Record '{record_id}' not found")
            }
            Self::FailedPrecondition {
                backend,
                raw_message,
            } => write_with_message(f, backend, "Failed precondition", raw_message.as_deref()),
            Self::QuotaExceeded { backend, .. } => {
                write!(f, "[{backend}] Quota exceeded")
            }
            Self::ParseError { backend, detail } => {
                write!(f, "[{backend}] Parse error: {detail}")
            }
            Self::SerializationError { backend, detail } => {
                write!(f, "[{backend}] Serialization error: {detail}")
            }
            Self::Unknown {
                backend,
                raw_message,
                ..
            } => {
                write!(f, "[{backend}] {raw_message}")
            }
        }
    }
}

fn write_with_message(
    f: &mut std::fmt::Formatter<'_>,
    backend: &str,
    label: &str,
    raw_message: Option<&str>,
) -> std::fmt::Result {
    if let Some(msg) = raw_message {
        write!(f, "[{backend}] {label}: {msg}")
    } else {
        write!(f, "[{backend}] {label}")
    }
}

impl std::error::Error for RemoteError {}

/// Convenience type alias for `Result<T, RemoteError>`.
pub type Result<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(code: Option<&str>, message: &str) -> RemoteError {
        RemoteError::Unknown {
            backend: "test".to_string(),
            raw_code: code.map(str::to_string),
            raw_message: message.to_string(),
        }
    }

    #[test]
    fn display_network_error() {
        let e = RemoteError::NetworkError {
            backend: "test".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(e.to_string(), "[test] Network error: connection refused");
    }

    #[test]
    fn display_permission_denied_with_message() {
        let e = RemoteError::PermissionDenied {
            backend: "firestore".to_string(),
            raw_message: Some("Missing or insufficient permissions.".to_string()),
        };
        assert_eq!(
            e.to_string(),
            "[firestore] Permission denied: Missing or insufficient permissions."
        );
    }

    #[test]
    fn display_unavailable_without_message() {
        let e = RemoteError::Unavailable {
            backend: "firestore".to_string(),
            raw_message: None,
        };
        assert_eq!(e.to_string(), "[firestore] Service unavailable");
    }

    #[test]
    fn display_rate_limited_with_retry() {
        let e = RemoteError::RateLimited {
            backend: "firestore".to_string(),
            retry_after: Some(3),
            raw_message: None,
        };
        assert_eq!(e.to_string(), "[firestore] Rate limited (retry after 3s)");
    }

    #[test]
    fn display_record_not_found() {
        let e = RemoteError::RecordNotFound {
            backend: "firestore".to_string(),
            record_id: "abc".to_string(),
            raw_message: None,
        };
        assert_eq!(e.to_string(), "[firestore] Record 'abc' not found");
    }

    #[test]
    fn structured_transient_variants() {
        let transient = [
            RemoteError::NetworkError {
                backend: "t".into(),
                detail: "x".into(),
            },
            RemoteError::Timeout {
                backend: "t".into(),
                detail: "x".into(),
            },
            RemoteError::Unavailable {
                backend: "t".into(),
                raw_message: None,
            },
            RemoteError::Aborted {
                backend: "t".into(),
                raw_message: None,
            },
            RemoteError::RateLimited {
                backend: "t".into(),
                retry_after: None,
                raw_message: None,
            },
        ];
        for e in &transient {
            assert!(e.is_transient(), "{e:?} should be transient");
            assert!(!e.is_expected(), "{e:?} should not be expected");
        }
    }

    #[test]
    fn fatal_variants_are_not_transient() {
        let fatal = [
            RemoteError::PermissionDenied {
                backend: "t".into(),
                raw_message: None,
            },
            RemoteError::InvalidParameter {
                backend: "t".into(),
                param: "p".into(),
                detail: "d".into(),
            },
            RemoteError::QuotaExceeded {
                backend: "t".into(),
                raw_message: None,
            },
            RemoteError::ParseError {
                backend: "t".into(),
                detail: "d".into(),
            },
        ];
        for e in &fatal {
            assert!(!e.is_transient(), "{e:?} should be fatal");
        }
    }

    #[test]
    fn unknown_matches_transient_markers() {
        assert!(unknown(Some("UNAVAILABLE"), "backend down").is_transient());
        assert!(unknown(None, "Deadline exceeded while committing").is_transient());
        assert!(unknown(None, "transaction ABORTED").is_transient());
        assert!(unknown(None, "please retry later").is_transient());
        assert!(unknown(None, "Network request failed").is_transient());
        assert!(unknown(None, "BloomFilter error while listening").is_transient());
    }

    #[test]
    fn unknown_without_markers_is_fatal() {
        assert!(!unknown(Some("INTERNAL"), "something odd").is_transient());
        assert!(!unknown(None, "invalid document path").is_transient());
    }

    #[test]
    fn retry_after_only_for_rate_limited() {
        let e = RemoteError::RateLimited {
            backend: "t".into(),
            retry_after: Some(5),
            raw_message: None,
        };
        assert_eq!(e.retry_after(), Some(5));
        assert_eq!(unknown(None, "x").retry_after(), None);
    }

    #[test]
    fn serializes_with_code_tag() {
        let e = RemoteError::Aborted {
            backend: "firestore".into(),
            raw_message: None,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["code"], "Aborted");
        assert_eq!(json["backend"], "firestore");
    }
}
