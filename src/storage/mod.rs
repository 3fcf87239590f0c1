//! Storage layer for Periphery
//!
//! A single SQLite database holds project records, dependency rows, scrape
//! progress with its step ledger, the scrape log and influence totals.

pub mod database;
pub mod dependencies;
pub mod influence;
pub mod logs;
pub mod progress;
pub mod projects;

use chrono::{DateTime, Utc};

pub use database::{Database, DbConn, DbPool};
pub use projects::{AnalysisStatus, Manifest, Project, DEFAULT_MANIFEST_NAME};

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
