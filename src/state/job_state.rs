//! Crawl job record and its state machine
//!
//! A job moves `pending -> running -> {done | failed | cancelled}`. Once a
//! terminal status is reached the record is frozen: every mutator returns
//! `CrawlError::InvalidTransition`.

use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Identifier of a crawl job
pub type JobId = Uuid;

/// Lifecycle status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Created and persisted, not yet started
    Pending,

    /// Workers are pulling from the frontier
    Running,

    /// Frontier exhausted (empty or budget-capped) without a fatal error
    Done,

    /// Stopped by a job-fatal error
    Failed,

    /// Stopped by an external cancellation request
    Cancelled,
}

impl JobStatus {
    /// Returns true once no further mutation is permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the state machine permits `self -> next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Running, Self::Done)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Outcome of processing one frontier entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Persisted as a new document
    Stored,

    /// Fetched successfully but identical to a document from an earlier job
    /// of the same source (source-scoped deduplication only)
    Unchanged,

    /// Fingerprint already recorded in this job
    Duplicate,

    /// Blocked by robots.txt
    Disallowed,

    /// Fetch or extraction failed
    Failed(String),
}

/// Page counters of a crawl job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounters {
    pub pages_crawled: u64,
    pub pages_new: u64,
    pub pages_failed: u64,
    pub pages_skipped: u64,
}

impl JobCounters {
    /// Applies a page outcome to the counters
    pub fn apply(&mut self, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Stored => {
                self.pages_crawled += 1;
                self.pages_new += 1;
            }
            PageOutcome::Unchanged => self.pages_crawled += 1,
            PageOutcome::Duplicate | PageOutcome::Disallowed => self.pages_skipped += 1,
            PageOutcome::Failed(_) => self.pages_failed += 1,
        }
    }

    /// Total number of pages with a recorded outcome
    pub fn total(&self) -> u64 {
        self.pages_crawled + self.pages_failed + self.pages_skipped
    }
}

/// Configuration snapshot taken when the job is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub max_pages: u32,
    pub max_depth: u32,
    pub concurrency: u32,
    pub follow_links: bool,
    pub respect_robots_txt: bool,
}

/// One traversal run
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub id: JobId,
    pub source_id: String,
    pub start_url: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub counters: JobCounters,
    pub config: JobConfig,
    pub error_message: Option<String>,
}

impl CrawlJob {
    /// Creates a job in the `pending` state
    pub fn new(source_id: &str, start_url: &str, config: JobConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source_id.to_string(),
            start_url: start_url.to_string(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            counters: JobCounters::default(),
            config,
            error_message: None,
        }
    }

    /// `pending -> running`, recording `started_at`
    pub fn start(&mut self) -> Result<(), CrawlError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Records a page outcome; only legal while running
    pub fn record(&mut self, outcome: &PageOutcome) -> Result<(), CrawlError> {
        if self.status != JobStatus::Running {
            return Err(CrawlError::InvalidTransition {
                from: self.status,
                to: self.status,
            });
        }
        self.counters.apply(outcome);
        Ok(())
    }

    /// Moves the job into a terminal status
    pub fn finish(&mut self, status: JobStatus, error: Option<String>) -> Result<(), CrawlError> {
        if !status.is_terminal() {
            return Err(CrawlError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.transition(status)?;
        self.completed_at = Some(Utc::now());
        self.error_message = error;
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), CrawlError> {
        if !self.status.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
