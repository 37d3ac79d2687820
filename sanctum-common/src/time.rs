//! Timestamp helpers
//!
//! All timestamps are stored as RFC 3339 text in UTC with microsecond
//! precision so that lexical order in SQLite matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Current time as a storage string
pub fn now_string() -> String {
    to_storage(Utc::now())
}

/// Format a timestamp for storage
pub fn to_storage(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_storage(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", value, e)))
}
