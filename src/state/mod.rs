//! State tracking for crawl jobs
//!
//! # Components
//!
//! - `CrawlJob`: the job record and its `pending -> running -> terminal` state machine
//! - `PageOutcome` / `JobCounters`: per-page results folded into job counters
//! - `DomainState`: per-origin request spacing for politeness

mod domain_state;
mod job_state;

pub use domain_state::DomainState;
pub use job_state::{CrawlJob, JobConfig, JobCounters, JobId, JobStatus, PageOutcome};
