//! Storage module for persisting crawl data
//!
//! The crawler writes through the [`CrawlJobStore`] trait only. The SQLite
//! implementation additionally offers read helpers for the CLI and tests.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CrawlJobStore, StorageError, StorageResult};

use crate::extract::Table;
use crate::state::JobId;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Opens (or creates) the SQLite job store at `path`
pub fn open_store(path: &Path) -> crate::Result<SqliteStore> {
    Ok(SqliteStore::new(path)?)
}

/// One accepted page, as persisted
///
/// Immutable once written; classification columns are owned by a later
/// pipeline stage and start out empty.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub job_id: JobId,
    pub source_id: String,

    /// URL as dequeued from the frontier
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub depth: u32,
    pub status_code: u16,
    pub title: Option<String>,
    pub content: String,
    pub tables: Vec<Table>,
    pub metadata: BTreeMap<String, String>,
    pub announcements: Vec<String>,
    pub content_hash: String,
    pub likely_relevant: bool,
    pub fetched_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}
