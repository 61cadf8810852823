//! Content fingerprinting and duplicate suppression
//!
//! A fingerprint is the hex SHA-256 of a page's normalized main text, so
//! markup churn that does not change the visible text does not defeat it.
//! Fingerprints are tracked per job by default; `DedupScope::Source` also
//! remembers them across jobs of the same source for the process lifetime.

use crate::state::JobId;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Where fingerprints are remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupScope {
    #[default]
    Job,
    Source,
}

/// Result of checking a fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Never seen
    New,
    /// Seen in an earlier job of the same source
    SeenInSource,
    /// Already recorded in this job
    Duplicate,
}

/// Computes the content fingerprint of normalized text
pub fn fingerprint(normalized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
struct Seen {
    by_job: HashMap<JobId, HashSet<String>>,
    by_source: HashMap<String, HashSet<String>>,
}

/// Tracks fingerprints seen by running jobs
#[derive(Debug, Default)]
pub struct Deduplicator {
    scope: DedupScope,
    seen: Mutex<Seen>,
}

impl Deduplicator {
    pub fn new(scope: DedupScope) -> Self {
        Self {
            scope,
            seen: Mutex::new(Seen::default()),
        }
    }

    pub fn scope(&self) -> DedupScope {
        self.scope
    }

    /// Returns true if `hash` was already recorded in `job_id`
    pub fn seen(&self, job_id: JobId, hash: &str) -> bool {
        let seen = self.lock();
        seen.by_job
            .get(&job_id)
            .is_some_and(|hashes| hashes.contains(hash))
    }

    /// Records `hash` for `job_id` (and for its source in source scope)
    pub fn record(&self, job_id: JobId, source_id: &str, hash: &str) {
        let mut seen = self.lock();
        seen.by_job.entry(job_id).or_default().insert(hash.to_string());
        if self.scope == DedupScope::Source {
            seen.by_source
                .entry(source_id.to_string())
                .or_default()
                .insert(hash.to_string());
        }
    }

    /// Checks and records in one step so concurrent workers cannot both
    /// treat the same content as new
    pub fn check_and_record(&self, job_id: JobId, source_id: &str, hash: &str) -> Verdict {
        let mut seen = self.lock();

        let job_hashes = seen.by_job.entry(job_id).or_default();
        if !job_hashes.insert(hash.to_string()) {
            return Verdict::Duplicate;
        }

        if self.scope == DedupScope::Job {
            return Verdict::New;
        }

        let source_hashes = seen.by_source.entry(source_id.to_string()).or_default();
        if source_hashes.insert(hash.to_string()) {
            Verdict::New
        } else {
            Verdict::SeenInSource
        }
    }

    /// Drops the per-job set once a job is finished
    pub fn forget_job(&self, job_id: JobId) {
        self.lock().by_job.remove(&job_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Seen> {
        // A poisoned set is still a valid set of strings
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }
}
