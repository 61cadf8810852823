//! Job manager: the control plane for crawl jobs
//!
//! `submit` validates a request, persists the pending job and spawns its
//! run; callers then poll `status`, watch `subscribe`, or await `wait`.

use crate::config::{Config, CrawlerConfig, Source};
use crate::crawler::coordinator::{spawn_job, Coordinator, Services};
use crate::crawler::fetcher::{build_http_client, HttpFetcher, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::request::CrawlRequest;
use crate::crawler::scheduler::Scheduler;
use crate::dedup::Deduplicator;
use crate::extract::ContentExtractor;
use crate::robots::RobotsPolicy;
use crate::state::{CrawlJob, JobId};
use crate::storage::CrawlJobStore;
use crate::CrawlError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

struct JobHandle {
    updates: watch::Receiver<CrawlJob>,
    cancel: CancellationToken,
}

/// Registry entry; a finished job keeps only its final snapshot
enum JobSlot {
    Active(JobHandle),
    Finished(CrawlJob),
}

impl JobSlot {
    fn snapshot(&self) -> CrawlJob {
        match self {
            Self::Active(handle) => handle.updates.borrow().clone(),
            Self::Finished(job) => job.clone(),
        }
    }

    /// Drops the channel and token once the job is terminal
    fn settle(&mut self) {
        if let Self::Active(handle) = self {
            let job = handle.updates.borrow().clone();
            if job.status.is_terminal() {
                *self = Self::Finished(job);
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        self.settle();
        matches!(self, Self::Finished(_))
    }
}

/// Runs crawl jobs against a shared fetcher, robots cache, politeness
/// scheduler and store
pub struct Crawler {
    services: Arc<Services>,
    jobs: Mutex<HashMap<JobId, JobSlot>>,
}

impl Crawler {
    /// Builds a crawler with the default HTTP fetcher
    pub fn new(config: &Config, store: Arc<dyn CrawlJobStore>) -> crate::Result<Self> {
        let client = build_http_client(&config.user_agent, config.crawler.fetch_timeout())?;
        let fetcher = Arc::new(HttpFetcher::new(client.clone()));
        Self::build(config, store, fetcher, RobotsPolicy::new(client, config.crawler.robots_timeout()))
    }

    /// Builds a crawler with a custom page fetcher
    ///
    /// robots.txt is still fetched over HTTP.
    pub fn with_fetcher(
        config: &Config,
        store: Arc<dyn CrawlJobStore>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> crate::Result<Self> {
        let client = build_http_client(&config.user_agent, config.crawler.robots_timeout())?;
        Self::build(config, store, fetcher, RobotsPolicy::new(client, config.crawler.robots_timeout()))
    }

    fn build(
        config: &Config,
        store: Arc<dyn CrawlJobStore>,
        fetcher: Arc<dyn PageFetcher>,
        robots: RobotsPolicy,
    ) -> crate::Result<Self> {
        let extractor = ContentExtractor::new(&config.extractor)?;

        let services = Services {
            config: config.crawler.clone(),
            fetcher,
            robots,
            scheduler: Scheduler::new(config.crawler.request_delay()),
            extractor: Arc::new(extractor),
            dedup: Deduplicator::new(config.crawler.dedup_scope),
            store,
        };

        Ok(Self {
            services: Arc::new(services),
            jobs: Mutex::new(HashMap::new()),
        })
    }

    /// Crawler defaults used for new requests
    pub fn defaults(&self) -> &CrawlerConfig {
        &self.services.config
    }

    /// Shared robots.txt policy, e.g. to invalidate an origin
    pub fn robots(&self) -> &RobotsPolicy {
        &self.services.robots
    }

    /// Request for a configured source using the crawler defaults
    pub fn request_for_source(&self, source: &Source) -> CrawlRequest {
        CrawlRequest::for_source(source, &self.services.config)
    }

    /// Validates `request`, records a pending job and starts it
    ///
    /// Returns as soon as the job is persisted. Invalid requests are
    /// rejected here and never produce a job. Must be called from within a
    /// Tokio runtime.
    pub fn submit(&self, request: CrawlRequest) -> crate::Result<JobId> {
        let seed = request.validate()?;

        let mut frontier = Frontier::new(request.max_pages, request.max_depth);
        frontier.seed(&seed)?;

        let job = CrawlJob::new(&request.source_id, &request.start_url, request.job_config());
        let id = job.id;
        self.services.store.insert_job(&job)?;

        let (updates_tx, updates_rx) = watch::channel(job);
        let cancel = CancellationToken::new();

        self.lock_jobs().insert(
            id,
            JobSlot::Active(JobHandle {
                updates: updates_rx,
                cancel: cancel.clone(),
            }),
        );

        info!(
            "Submitted crawl job {} for {} ({})",
            id, request.source_id, request.start_url
        );

        let coordinator = Coordinator::new(
            Arc::clone(&self.services),
            updates_tx,
            frontier,
            &seed,
            cancel,
        );
        spawn_job(coordinator);

        Ok(id)
    }

    /// Point-in-time snapshot of a job
    pub fn status(&self, id: JobId) -> Option<CrawlJob> {
        let mut jobs = self.lock_jobs();
        let slot = jobs.get_mut(&id)?;
        slot.settle();
        Some(slot.snapshot())
    }

    /// Snapshots of every job submitted to this crawler
    pub fn jobs(&self) -> Vec<CrawlJob> {
        let mut jobs: Vec<CrawlJob> = self
            .lock_jobs()
            .values_mut()
            .map(|slot| {
                slot.settle();
                slot.snapshot()
            })
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Receiver of job snapshots, updated on every change
    ///
    /// For a finished job the receiver holds the final snapshot and its
    /// channel is already closed.
    pub fn subscribe(&self, id: JobId) -> Option<watch::Receiver<CrawlJob>> {
        match self.lock_jobs().get(&id)? {
            JobSlot::Active(handle) => Some(handle.updates.clone()),
            JobSlot::Finished(job) => Some(watch::channel(job.clone()).1),
        }
    }

    /// Waits until the job reaches a terminal status
    pub async fn wait(&self, id: JobId) -> Option<CrawlJob> {
        let mut updates = self.subscribe(id)?;

        let finished = updates
            .wait_for(|job| job.status.is_terminal())
            .await
            .map(|job| (*job).clone());

        let job = match finished {
            Ok(job) => job,
            Err(_) => updates.borrow().clone(),
        };

        if let Some(slot) = self.lock_jobs().get_mut(&id) {
            slot.settle();
        }
        Some(job)
    }

    /// Requests cancellation of a job
    ///
    /// Returns false for unknown or already finished jobs. In-flight fetches
    /// complete; no new fetches are issued.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut jobs = self.lock_jobs();
        let Some(slot) = jobs.get_mut(&id) else {
            return false;
        };

        slot.settle();
        let JobSlot::Active(handle) = slot else {
            return false;
        };

        info!("Cancelling crawl job {}", id);
        handle.cancel.cancel();
        true
    }

    /// Requests cancellation of every unfinished job; returns how many
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<JobId> = self.lock_jobs().keys().copied().collect();
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Forgets every finished job; returns how many were removed
    ///
    /// Their rows stay in the store; `status` returns `None` afterwards.
    pub fn prune_finished(&self) -> usize {
        let mut jobs = self.lock_jobs();
        let before = jobs.len();
        jobs.retain(|_, slot| !slot.is_finished());
        before - jobs.len()
    }

    /// Submits a request and waits for the job to finish
    pub async fn run(&self, request: CrawlRequest) -> crate::Result<CrawlJob> {
        let id = self.submit(request)?;
        self.wait(id).await.ok_or(CrawlError::UnknownJob(id))
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<JobId, JobSlot>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}
