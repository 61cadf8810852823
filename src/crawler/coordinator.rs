//! Crawler coordinator - orchestration of one crawl job
//!
//! A job runs `concurrency` workers over a shared frontier. Each worker:
//! 1. Dequeues the next entry (budget and uniqueness enforced by the frontier)
//! 2. Checks robots.txt when the job respects it
//! 3. Waits for the origin's politeness slot
//! 4. Fetches the page (time-bounded)
//! 5. Extracts content on the blocking pool (time-bounded)
//! 6. Fingerprints and deduplicates the main text
//! 7. Persists new documents
//! 8. Offers in-scope links one level deeper
//!
//! Per-page failures only bump counters. Store failures and frontier
//! corruption are fatal and stop the job.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchResult, PageFetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::scheduler::Scheduler;
use crate::dedup::{fingerprint, Deduplicator, Verdict};
use crate::extract::{ContentExtractor, PageContent};
use crate::robots::RobotsPolicy;
use crate::state::{CrawlJob, JobId, JobStatus, PageOutcome};
use crate::storage::{CrawlJobStore, Document};
use crate::url::{origin_of, ScopeFilter};
use crate::CrawlError;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Error message recorded on cancelled jobs
pub const CANCELLED_MESSAGE: &str = "cancelled by request";

/// Crawler-wide collaborators shared by every job
pub(crate) struct Services {
    pub config: CrawlerConfig,
    pub fetcher: Arc<dyn PageFetcher>,
    pub robots: RobotsPolicy,
    pub scheduler: Scheduler,
    pub extractor: Arc<ContentExtractor>,
    pub dedup: Deduplicator,
    pub store: Arc<dyn CrawlJobStore>,
}

/// Outcome of fetching and extracting one frontier entry
#[derive(Debug, Clone)]
pub struct PageResult {
    pub url: Url,
    pub depth: u32,
    pub final_url: Option<Url>,
    pub status_code: Option<u16>,
    pub fingerprint: Option<String>,
    pub outcome: PageOutcome,

    /// In-scope links to offer at `depth + 1`
    pub links: Vec<Url>,

    pub elapsed: Duration,
}

impl PageResult {
    fn new(entry: &FrontierEntry, outcome: PageOutcome, started: Instant) -> Self {
        Self {
            url: entry.url.clone(),
            depth: entry.depth,
            final_url: None,
            status_code: None,
            fingerprint: None,
            outcome,
            links: Vec::new(),
            elapsed: started.elapsed(),
        }
    }
}

struct FrontierState {
    frontier: Frontier,
    in_flight: usize,
}

/// Orchestrator of a single job
pub(crate) struct Coordinator {
    services: Arc<Services>,
    job: watch::Sender<CrawlJob>,
    id: JobId,
    source_id: String,
    state: Mutex<FrontierState>,
    wakeup: Notify,
    cancel: CancellationToken,
    scope: ScopeFilter,
    fatal: Mutex<Option<String>>,
}

impl Coordinator {
    pub fn new(
        services: Arc<Services>,
        job: watch::Sender<CrawlJob>,
        frontier: Frontier,
        seed: &Url,
        cancel: CancellationToken,
    ) -> Self {
        let (id, source_id) = {
            let snapshot = job.borrow();
            (snapshot.id, snapshot.source_id.clone())
        };
        let scope = ScopeFilter::new(
            services.config.link_scope,
            seed,
            &services.config.allowed_domains,
        );

        Self {
            services,
            job,
            id,
            source_id,
            state: Mutex::new(FrontierState {
                frontier,
                in_flight: 0,
            }),
            wakeup: Notify::new(),
            cancel,
            scope,
            fatal: Mutex::new(None),
        }
    }

    /// Runs the job to a terminal status
    pub async fn run(self: Arc<Self>) {
        let started = Instant::now();
        let workers = self.job.borrow().config.concurrency.max(1) as usize;

        self.job.send_modify(|job| {
            if let Err(e) = job.start() {
                error!("Cannot start job: {}", e);
            }
        });
        self.persist();
        info!("Crawl started with {} workers", workers);

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let coordinator = Arc::clone(&self);
            pool.spawn(coordinator.worker(worker).in_current_span());
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                self.fail(format!("worker task failed: {}", e));
            }
        }

        self.finish(started.elapsed());
    }

    async fn worker(self: Arc<Self>, worker: usize) {
        debug!("Worker {} started", worker);

        while let Some(entry) = self.next_entry().await {
            let result = match self.process(&entry).await {
                Ok(result) => result,
                Err(e) => {
                    self.fail(e.to_string());
                    None
                }
            };
            self.complete(result);
        }

        debug!("Worker {} finished", worker);
    }

    /// Dequeues the next entry, waiting while other workers may still
    /// discover links
    async fn next_entry(&self) -> Option<FrontierEntry> {
        loop {
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.cancel.is_cancelled() {
                return None;
            }

            {
                let mut state = self.lock_state();
                match state.frontier.next() {
                    Ok(Some(entry)) => {
                        state.in_flight += 1;
                        return Some(entry);
                    }
                    Ok(None) => {
                        if state.frontier.budget_reached() || state.in_flight == 0 {
                            return None;
                        }
                    }
                    Err(e) => {
                        drop(state);
                        self.fail(e.to_string());
                        return None;
                    }
                }
            }

            tokio::select! {
                _ = notified => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// Processes one entry; `Ok(None)` when cancellation intervened before
    /// the fetch
    async fn process(&self, entry: &FrontierEntry) -> Result<Option<PageResult>, CrawlError> {
        let started = Instant::now();
        let config = self.job.borrow().config.clone();
        debug!("Processing {} (depth {})", entry.url, entry.depth);

        let Some(origin) = origin_of(&entry.url) else {
            let reason = format!("no origin for {}", entry.url);
            return Ok(Some(PageResult::new(entry, PageOutcome::Failed(reason), started)));
        };

        if config.respect_robots_txt && !self.services.robots.is_allowed(&entry.url).await {
            info!("URL {} disallowed by robots.txt", entry.url);
            return Ok(Some(PageResult::new(entry, PageOutcome::Disallowed, started)));
        }

        if !self.services.scheduler.wait_turn(&origin, &self.cancel).await {
            debug!("Cancelled before fetching {}", entry.url);
            return Ok(None);
        }

        let fetch_timeout = self.services.config.fetch_timeout();
        let fetched =
            match tokio::time::timeout(fetch_timeout, self.services.fetcher.fetch(&entry.url))
                .await
            {
                Ok(fetched) => fetched,
                Err(_) => FetchResult::NetworkError {
                    error: format!("fetch timed out after {:?}", fetch_timeout),
                },
            };

        let (final_url, status_code, body) = match fetched {
            FetchResult::Success {
                final_url,
                status_code,
                body,
                ..
            } => (final_url, status_code, body),
            failed => {
                let reason = failed.failure_reason().unwrap_or_default();
                warn!("Fetch failed for {}: {}", entry.url, reason);
                let mut result = PageResult::new(entry, PageOutcome::Failed(reason), started);
                if let FetchResult::HttpError { status_code } = failed {
                    result.status_code = Some(status_code);
                }
                return Ok(Some(result));
            }
        };

        let mut content = match self.extract(body, final_url.clone()).await {
            Ok(content) => content,
            Err(reason) => {
                warn!("Extraction failed for {}: {}", entry.url, reason);
                let mut result = PageResult::new(entry, PageOutcome::Failed(reason), started);
                result.status_code = Some(status_code);
                result.final_url = Some(final_url);
                return Ok(Some(result));
            }
        };

        let hash = fingerprint(&content.text);
        let verdict = self
            .services
            .dedup
            .check_and_record(self.id, &self.source_id, &hash);

        let outcome = match verdict {
            Verdict::Duplicate => {
                debug!("Duplicate content at {}", entry.url);
                PageOutcome::Duplicate
            }
            Verdict::SeenInSource => {
                debug!("Unchanged since an earlier crawl: {}", entry.url);
                PageOutcome::Unchanged
            }
            Verdict::New => PageOutcome::Stored,
        };

        let links = if outcome != PageOutcome::Duplicate
            && config.follow_links
            && entry.depth < config.max_depth
        {
            std::mem::take(&mut content.links)
                .into_iter()
                .filter(|link| self.scope.allows(link))
                .collect()
        } else {
            Vec::new()
        };

        if outcome == PageOutcome::Stored {
            let document = self.document(entry, &final_url, status_code, content, &hash, started);
            self.services.store.insert_document(&document)?;
        }

        Ok(Some(PageResult {
            url: entry.url.clone(),
            depth: entry.depth,
            final_url: Some(final_url),
            status_code: Some(status_code),
            fingerprint: Some(hash),
            outcome,
            links,
            elapsed: started.elapsed(),
        }))
    }

    /// Runs the extractor on the blocking pool under the extraction timeout
    async fn extract(&self, body: String, page_url: Url) -> Result<PageContent, String> {
        let extractor = Arc::clone(&self.services.extractor);
        let timeout = self.services.config.extract_timeout();

        let task = tokio::task::spawn_blocking(move || extractor.extract(&body, &page_url));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(format!("extraction panicked: {}", e)),
            Err(_) => Err(format!("extraction timed out after {:?}", timeout)),
        }
    }

    fn document(
        &self,
        entry: &FrontierEntry,
        final_url: &Url,
        status_code: u16,
        content: PageContent,
        hash: &str,
        started: Instant,
    ) -> Document {
        let likely_relevant = content.is_likely_relevant();
        Document {
            id: Uuid::new_v4(),
            job_id: self.id,
            source_id: self.source_id.clone(),
            url: entry.url.to_string(),
            final_url: final_url.to_string(),
            depth: entry.depth,
            status_code,
            title: content.title,
            content: content.text,
            tables: content.tables,
            metadata: content.metadata,
            announcements: content.announcements,
            content_hash: hash.to_string(),
            likely_relevant,
            fetched_at: Utc::now(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Records a processed entry, offers its links and releases the
    /// in-flight slot
    fn complete(&self, result: Option<PageResult>) {
        let mut processed = None;

        if let Some(result) = &result {
            if let PageOutcome::Failed(reason) = &result.outcome {
                debug!("{} failed after {:?}: {}", result.url, result.elapsed, reason);
            }

            self.job.send_modify(|job| {
                if job.record(&result.outcome).is_ok() {
                    processed = Some(job.counters.total());
                }
            });
        }

        {
            let mut state = self.lock_state();
            if let Some(result) = &result {
                let depth = result.depth + 1;
                let offered = result
                    .links
                    .iter()
                    .filter(|link| state.frontier.offer(link, depth))
                    .count();
                if offered > 0 {
                    debug!("Queued {} links from {}", offered, result.url);
                }
            }
            state.in_flight -= 1;
        }
        self.wakeup.notify_waiters();

        let interval = u64::from(self.services.config.progress_interval.max(1));
        if let Some(total) = processed.filter(|total| total % interval == 0) {
            let counters = self.job.borrow().counters;
            info!(
                "Progress: {} pages processed ({} new, {} failed, {} skipped)",
                total, counters.pages_new, counters.pages_failed, counters.pages_skipped
            );
            self.persist();
        }
    }

    /// Records a job-fatal error and stops issuing new work
    fn fail(&self, message: String) {
        error!("Crawl job failed: {}", message);
        {
            let mut fatal = self.fatal.lock().unwrap_or_else(|e| e.into_inner());
            fatal.get_or_insert(message);
        }
        self.cancel.cancel();
        self.wakeup.notify_waiters();
    }

    fn finish(&self, elapsed: Duration) {
        let fatal = self
            .fatal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let (status, message) = match fatal {
            Some(message) => (JobStatus::Failed, Some(message)),
            None if self.cancel.is_cancelled() => {
                (JobStatus::Cancelled, Some(CANCELLED_MESSAGE.to_string()))
            }
            None => (JobStatus::Done, None),
        };

        // A terminal snapshot is only published once it is persisted
        let mut snapshot = self.job.borrow().clone();
        if let Err(e) = snapshot.finish(status, message) {
            error!("Cannot finish job: {}", e);
        }
        if let Err(e) = self.services.store.update_job_status(&snapshot) {
            error!("Failed to persist final job status: {}", e);
        }
        self.job.send_replace(snapshot.clone());
        self.services.dedup.forget_job(self.id);

        let dequeued = self.lock_state().frontier.dequeued();
        info!(
            "Crawl {} in {:?}: {} dequeued, {} crawled, {} new, {} failed, {} skipped",
            snapshot.status,
            elapsed,
            dequeued,
            snapshot.counters.pages_crawled,
            snapshot.counters.pages_new,
            snapshot.counters.pages_failed,
            snapshot.counters.pages_skipped
        );
    }

    /// Writes the current job snapshot; a store failure is fatal
    fn persist(&self) {
        let snapshot = self.job.borrow().clone();
        if let Err(e) = self.services.store.update_job_status(&snapshot) {
            self.fail(format!("failed to persist job progress: {}", e));
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Spawns `coordinator` inside a span carrying the job and source ids
pub(crate) fn spawn_job(coordinator: Coordinator) -> tokio::task::JoinHandle<()> {
    let span = tracing::info_span!(
        "crawl_job",
        job_id = %coordinator.id,
        source = %coordinator.source_id
    );
    tokio::spawn(Arc::new(coordinator).run().instrument(span))
}
