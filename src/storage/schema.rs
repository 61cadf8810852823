//! Database schema definitions
//!
//! Two tables: `crawl_jobs` (one row per traversal run) and `documents`
//! (one row per accepted page). Classification columns on `documents` are
//! left NULL by the crawler and filled by a later pipeline stage.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl job
CREATE TABLE IF NOT EXISTS crawl_jobs (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    start_url TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    pages_new INTEGER NOT NULL DEFAULT 0,
    pages_failed INTEGER NOT NULL DEFAULT 0,
    pages_skipped INTEGER NOT NULL DEFAULT 0,
    max_pages INTEGER NOT NULL,
    max_depth INTEGER NOT NULL,
    concurrency INTEGER NOT NULL,
    follow_links INTEGER NOT NULL,
    respect_robots_txt INTEGER NOT NULL,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_jobs_source ON crawl_jobs(source_id);
CREATE INDEX IF NOT EXISTS idx_crawl_jobs_status ON crawl_jobs(status);

-- Accepted pages
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES crawl_jobs(id),
    source_id TEXT NOT NULL,
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    status_code INTEGER NOT NULL,
    title TEXT,
    content TEXT NOT NULL,
    tables_json TEXT NOT NULL,
    metadata_json TEXT NOT NULL,
    announcements_json TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    likely_relevant INTEGER NOT NULL,
    fetched_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    category TEXT,
    classified_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_documents_job ON documents(job_id);
CREATE INDEX IF NOT EXISTS idx_documents_source_hash ON documents(source_id, content_hash);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
