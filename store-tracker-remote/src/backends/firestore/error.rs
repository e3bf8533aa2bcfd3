//! Firestore error mapping

use crate::error::RemoteError;
use crate::traits::{ErrorContext, RawApiError, RemoteErrorMapper};

use super::FirestoreCollection;

/// Google RPC status mapping
/// Reference: <https://cloud.google.com/firestore/docs/understand-error-codes>
impl RemoteErrorMapper for FirestoreCollection {
    fn backend_name(&self) -> &'static str {
        "firestore"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> RemoteError {
        let backend = self.backend_name().to_string();
        let status = raw.code.as_deref().or(match raw.http_status {
            Some(400) => Some("INVALID_ARGUMENT"),
            Some(401) => Some("UNAUTHENTICATED"),
            Some(403) => Some("PERMISSION_DENIED"),
            Some(404) => Some("NOT_FOUND"),
            Some(409) => Some("ABORTED"),
            _ => None,
        });

        match status {
            Some("UNAVAILABLE") => RemoteError::Unavailable {
                backend,
                raw_message: Some(raw.message),
            },
            Some("DEADLINE_EXCEEDED") => RemoteError::Timeout {
                backend,
                detail: raw.message,
            },
            Some("ABORTED") => RemoteError::Aborted {
                backend,
                raw_message: Some(raw.message),
            },
            // 429 是写入速率限制；其他情况下为配额耗尽（如每日免费额度）
            Some("RESOURCE_EXHAUSTED") => {
                if raw.http_status == Some(429) && !raw.message.to_lowercase().contains("quota") {
                    RemoteError::RateLimited {
                        backend,
                        retry_after: None,
                        raw_message: Some(raw.message),
                    }
                } else {
                    RemoteError::QuotaExceeded {
                        backend,
                        raw_message: Some(raw.message),
                    }
                }
            }
            Some("UNAUTHENTICATED") => RemoteError::Unauthenticated {
                backend,
                raw_message: Some(raw.message),
            },
            Some("PERMISSION_DENIED") => RemoteError::PermissionDenied {
                backend,
                raw_message: Some(raw.message),
            },
            Some("INVALID_ARGUMENT") => RemoteError::InvalidParameter {
                backend,
                param: context.param.unwrap_or_else(|| "request".to_string()),
                detail: raw.message,
            },
            Some("NOT_FOUND") => RemoteError::RecordNotFound {
                backend,
                record_id: context.record_id.unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },
            Some("FAILED_PRECONDITION") => RemoteError::FailedPrecondition {
                backend,
                raw_message: Some(raw.message),
            },
            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FirestoreConfig;

    fn mapper() -> FirestoreCollection {
        FirestoreCollection::new(FirestoreConfig::new("demo")).unwrap()
    }

    fn map(http: u16, status: Option<&str>, message: &str) -> RemoteError {
        mapper().map_error(
            RawApiError::with_status(http, status.map(str::to_string), message),
            ErrorContext::for_record("r1"),
        )
    }

    #[test]
    fn transient_statuses() {
        assert!(matches!(
            map(503, Some("UNAVAILABLE"), "down"),
            RemoteError::Unavailable { .. }
        ));
        assert!(matches!(
            map(504, Some("DEADLINE_EXCEEDED"), "slow"),
            RemoteError::Timeout { .. }
        ));
        assert!(matches!(
            map(409, Some("ABORTED"), "contention"),
            RemoteError::Aborted { .. }
        ));
        assert!(map(409, Some("ABORTED"), "contention").is_transient());
    }

    #[test]
    fn resource_exhausted_split() {
        assert!(matches!(
            map(429, Some("RESOURCE_EXHAUSTED"), "Too many writes"),
            RemoteError::RateLimited { .. }
        ));
        let quota = map(429, Some("RESOURCE_EXHAUSTED"), "Quota exceeded.");
        assert!(matches!(quota, RemoteError::QuotaExceeded { .. }));
        assert!(!quota.is_transient());
    }

    #[test]
    fn fatal_statuses() {
        assert!(matches!(
            map(403, Some("PERMISSION_DENIED"), "nope"),
            RemoteError::PermissionDenied { .. }
        ));
        let not_found = map(404, Some("NOT_FOUND"), "missing");
        assert!(matches!(
            &not_found,
            RemoteError::RecordNotFound { record_id, .. } if record_id == "r1"
        ));
    }

    #[test]
    fn http_status_fallback() {
        assert!(matches!(
            map(401, None, "expired"),
            RemoteError::Unauthenticated { .. }
        ));
    }

    #[test]
    fn unknown_keeps_raw_code() {
        let err = map(500, Some("INTERNAL"), "bloom filter error");
        assert!(matches!(&err, RemoteError::Unknown { raw_code: Some(c), .. } if c == "INTERNAL"));
        assert!(err.is_transient());
    }
}
