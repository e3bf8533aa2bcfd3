//! Timestamp (de)serialization for cached snapshots and metrics.
//!
//! - Serialization: `DateTime<Utc>` -> RFC3339 with millisecond precision
//! - Deserialization: RFC3339 string or Unix timestamp (seconds or milliseconds)

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stamp {
        Text(String),
        Number(i64),
    }

    match Stamp::deserialize(deserializer)? {
        Stamp::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::custom(format!("Invalid RFC3339 timestamp: {e}"))),
        Stamp::Number(ts) => from_unix(ts).ok_or_else(|| Error::custom("Invalid Unix timestamp")),
    }
}

/// Values above 10^11 are taken as milliseconds (`Date.now()` style).
fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 100_000_000_000 {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

/// Compact stamp for file names: `YYYYMMDD-HHMMSS` in local time.
pub fn file_stamp(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&chrono::Local)
        .format("%Y%m%d-%H%M%S")
        .to_string()
}
