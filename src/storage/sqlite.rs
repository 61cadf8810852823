//! SQLite storage implementation

use crate::state::{CrawlJob, JobConfig, JobCounters, JobId, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CrawlJobStore, StorageError, StorageResult};
use crate::storage::Document;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed job store
///
/// The connection sits behind a mutex so one store can be shared by every
/// worker of every job; each call holds it for a single statement.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database file at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Reads a job row back
    pub fn get_job(&self, id: JobId) -> StorageResult<Option<CrawlJob>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_id, start_url, status, created_at, started_at, completed_at,
                    pages_crawled, pages_new, pages_failed, pages_skipped,
                    max_pages, max_depth, concurrency, follow_links, respect_robots_txt,
                    error_message
             FROM crawl_jobs WHERE id = ?1",
        )?;

        let row = stmt
            .query_row(params![id.to_string()], job_from_row)
            .optional()?;

        row.transpose()
    }

    /// Number of documents stored for a job
    pub fn count_documents(&self, job_id: JobId) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE job_id = ?1",
            params![job_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// URLs of the documents stored for a job, in insertion order
    pub fn document_urls(&self, job_id: JobId) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT url FROM documents WHERE job_id = ?1 ORDER BY rowid")?;
        let urls = stmt
            .query_map(params![job_id.to_string()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
    }
}

impl CrawlJobStore for SqliteStore {
    fn insert_job(&self, job: &CrawlJob) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO crawl_jobs (
                id, source_id, start_url, status, created_at, started_at, completed_at,
                pages_crawled, pages_new, pages_failed, pages_skipped,
                max_pages, max_depth, concurrency, follow_links, respect_robots_txt,
                error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                job.id.to_string(),
                job.source_id,
                job.start_url,
                job.status.to_db_string(),
                job.created_at.to_rfc3339(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.completed_at.map(|t| t.to_rfc3339()),
                job.counters.pages_crawled as i64,
                job.counters.pages_new as i64,
                job.counters.pages_failed as i64,
                job.counters.pages_skipped as i64,
                job.config.max_pages,
                job.config.max_depth,
                job.config.concurrency,
                job.config.follow_links,
                job.config.respect_robots_txt,
                job.error_message,
            ],
        )?;
        Ok(())
    }

    fn update_job_status(&self, job: &CrawlJob) -> StorageResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE crawl_jobs SET
                status = ?1, started_at = ?2, completed_at = ?3,
                pages_crawled = ?4, pages_new = ?5, pages_failed = ?6, pages_skipped = ?7,
                error_message = ?8
             WHERE id = ?9",
            params![
                job.status.to_db_string(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.completed_at.map(|t| t.to_rfc3339()),
                job.counters.pages_crawled as i64,
                job.counters.pages_new as i64,
                job.counters.pages_failed as i64,
                job.counters.pages_skipped as i64,
                job.error_message,
                job.id.to_string(),
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::JobNotFound(job.id.to_string()));
        }
        Ok(())
    }

    fn insert_document(&self, document: &Document) -> StorageResult<()> {
        let tables_json = serde_json::to_string(&document.tables)?;
        let metadata_json = serde_json::to_string(&document.metadata)?;
        let announcements_json = serde_json::to_string(&document.announcements)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (
                id, job_id, source_id, url, final_url, depth, status_code, title, content,
                tables_json, metadata_json, announcements_json, content_hash,
                likely_relevant, fetched_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                document.id.to_string(),
                document.job_id.to_string(),
                document.source_id,
                document.url,
                document.final_url,
                document.depth,
                document.status_code,
                document.title,
                document.content,
                tables_json,
                metadata_json,
                announcements_json,
                document.content_hash,
                document.likely_relevant,
                document.fetched_at.to_rfc3339(),
                document.elapsed_ms as i64,
            ],
        )?;
        Ok(())
    }
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<StorageResult<CrawlJob>> {
    let id: String = row.get(0)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let started_at: Option<String> = row.get(5)?;
    let completed_at: Option<String> = row.get(6)?;

    let counters = JobCounters {
        pages_crawled: row.get::<_, i64>(7)? as u64,
        pages_new: row.get::<_, i64>(8)? as u64,
        pages_failed: row.get::<_, i64>(9)? as u64,
        pages_skipped: row.get::<_, i64>(10)? as u64,
    };

    let config = JobConfig {
        max_pages: row.get(11)?,
        max_depth: row.get(12)?,
        concurrency: row.get(13)?,
        follow_links: row.get(14)?,
        respect_robots_txt: row.get(15)?,
    };

    let source_id: String = row.get(1)?;
    let start_url: String = row.get(2)?;
    let error_message: Option<String> = row.get(16)?;

    let build = || -> StorageResult<CrawlJob> {
        Ok(CrawlJob {
            id: id
                .parse()
                .map_err(|e| StorageError::Serialization(format!("job id '{}': {}", id, e)))?,
            source_id,
            start_url,
            status: JobStatus::from_db_string(&status)
                .ok_or_else(|| StorageError::Serialization(format!("job status '{}'", status)))?,
            created_at: parse_timestamp(&created_at)?,
            started_at: started_at.as_deref().map(parse_timestamp).transpose()?,
            completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
            counters,
            config,
            error_message,
        })
    };

    Ok(build())
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("timestamp '{}': {}", value, e)))
}
