//! Log sanitization utilities
//!
//! Keeps whole document batches out of logs and masks the Web API key that
//! reqwest includes in transport error messages (`...?key=AIza...`).

/// Maximum number of characters kept by [`truncate_for_log`].
const TRUNCATE_LIMIT: usize = 256;

/// Query parameters whose values never reach a log line.
const SECRET_PARAMS: [&str; 2] = ["key=", "access_token="];

/// Truncate a string for safe logging.
///
/// Strings within the limit are returned as is; longer ones keep the first
/// `TRUNCATE_LIMIT` characters followed by the total byte length.
pub fn truncate_for_log(s: &str) -> String {
    match s.char_indices().nth(TRUNCATE_LIMIT) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}... [truncated, total {} bytes]", &s[..cut], s.len()),
    }
}

/// Replaces the values of secret query parameters with `***`.
pub fn redact_secrets(s: &str) -> String {
    let mut out = s.to_string();
    for param in SECRET_PARAMS {
        let mut from = 0;
        while let Some(pos) = out[from..].find(param) {
            let start = from + pos + param.len();
            // 只匹配完整参数名（前面是 ? 或 &）
            let boundary = start - param.len();
            if boundary > 0 && !matches!(out.as_bytes()[boundary - 1], b'?' | b'&') {
                from = start;
                continue;
            }
            let end = out[start..]
                .find(|c: char| c == '&' || c == ')' || c.is_whitespace())
                .map_or(out.len(), |i| start + i);
            out.replace_range(start..end, "***");
            from = start + 3;
        }
    }
    out
}
