//! Storage traits and error types

use crate::state::CrawlJob;
use crate::storage::Document;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Write-only persistence boundary of the crawler
///
/// The crawler never reads rows back through this trait. Any error returned
/// while a job is running is fatal to that job.
pub trait CrawlJobStore: Send + Sync {
    /// Inserts a freshly created (`pending`) job
    fn insert_job(&self, job: &CrawlJob) -> StorageResult<()>;

    /// Writes the job's current status, counters, timestamps and error
    fn update_job_status(&self, job: &CrawlJob) -> StorageResult<()>;

    /// Inserts one accepted page
    fn insert_document(&self, document: &Document) -> StorageResult<()>;
}
