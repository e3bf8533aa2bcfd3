//! Utility modules.

/// Lenient serde helpers for loosely-typed interchange data.
pub mod lenient;

/// Log sanitization utilities to keep request/response bodies out of logs.
pub mod log_sanitizer;
