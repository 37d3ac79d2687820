//! Database stores
//!
//! Free functions over `&SqlitePool`, one module per table family. Every
//! query that touches user-owned rows is scoped by `user_id`; a row owned by
//! someone else is indistinguishable from a missing row.

pub mod environments;
pub mod sections;
pub mod tracks;
pub mod users;

use sanctum_common::{Error, Result};
use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid stored id '{}': {}", value, e)))
}

/// `?, ?, ?` with `count` placeholders
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
