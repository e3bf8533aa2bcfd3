//! Lenient field deserializers for [`StoreRecord`](crate::StoreRecord).
//!
//! Interchange files written by hand or converted from spreadsheets are loose about
//! types: zip codes arrive as numbers, booleans as `"true"`, empty dates as `""`.
//! These helpers accept those shapes and fold them into the canonical types.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Any scalar → `String`; `null` → `""`.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::custom(format!("expected a string, got {other}"))),
    }
}

/// `bool` or `"true"`/`"false"` (any case); `null`/`""` → `false`.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::String(s) => parse_flag(&s).ok_or_else(|| Error::custom(format!("invalid boolean: {s}"))),
        Value::Number(n) => Ok(n.as_u64().is_some_and(|v| v != 0)),
        other => Err(Error::custom(format!("expected a boolean, got {other}"))),
    }
}

/// Non-negative integer or numeric string; `null`/`""` → `0`, negatives clamp to `0`.
#[allow(clippy::cast_possible_truncation)]
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(clamp_count)
            .ok_or_else(|| Error::custom(format!("invalid count: {n}"))),
        Value::String(s) => parse_count(&s).ok_or_else(|| Error::custom(format!("invalid count: {s}"))),
        other => Err(Error::custom(format!("expected a number, got {other}"))),
    }
}

/// Nullable date string; `""` is treated as `null`.
pub fn date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(non_empty(s)),
        other => Err(Error::custom(format!("expected a date string, got {other}"))),
    }
}

/// Like [`date`], but distinguishes "absent" (outer `None`, via `#[serde(default)]`)
/// from "explicitly cleared" (`Some(None)`).
pub fn patch_date<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    date(deserializer).map(Some)
}

/// Parses a textual boolean; `""` is `false`.
pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Parses a textual count; `""` is `0`.
pub fn parse_count(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    trimmed.parse::<i64>().ok().map(clamp_count)
}

/// Empty or whitespace-only strings become `None`.
pub fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

fn clamp_count(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Probe {
        #[serde(default, deserialize_with = "string")]
        s: String,
        #[serde(default, deserialize_with = "flag")]
        b: bool,
        #[serde(default, deserialize_with = "count")]
        n: u32,
        #[serde(default, deserialize_with = "date")]
        d: Option<String>,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numbers_become_strings() {
        assert_eq!(probe(r#"{"s": 1500001}"#).s, "1500001");
    }

    #[test]
    fn textual_flags() {
        assert!(probe(r#"{"b": "TRUE"}"#).b);
        assert!(!probe(r#"{"b": "false"}"#).b);
        assert!(!probe(r#"{"b": null}"#).b);
    }

    #[test]
    fn counts_from_strings_and_negatives() {
        assert_eq!(probe(r#"{"n": "3"}"#).n, 3);
        assert_eq!(probe(r#"{"n": ""}"#).n, 0);
        assert_eq!(probe(r#"{"n": -2}"#).n, 0);
    }

    #[test]
    fn empty_date_is_null() {
        assert_eq!(probe(r#"{"d": ""}"#).d, None);
        assert_eq!(probe(r#"{"d": "2024-08-15"}"#).d.as_deref(), Some("2024-08-15"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        assert_eq!(
            probe("{}"),
            Probe {
                s: String::new(),
                b: false,
                n: 0,
                d: None
            }
        );
    }

    #[test]
    fn invalid_flag_is_rejected() {
        assert!(serde_json::from_str::<Probe>(r#"{"b": "maybe"}"#).is_err());
    }
}
