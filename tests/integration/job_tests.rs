//! Job lifecycle: submission, polling, cancellation and failure

use crate::common::*;
use async_trait::async_trait;
use regcrawl::crawler::{FetchResult, PageFetcher, CANCELLED_MESSAGE};
use regcrawl::dedup::DedupScope;
use regcrawl::state::CrawlJob;
use regcrawl::storage::{CrawlJobStore, Document, SqliteStore, StorageError, StorageResult};
use regcrawl::{CrawlError, CrawlRequest, Crawler, JobStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::MockServer;

/// Serves canned results by path; unknown paths fail with a network error
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, FetchResult>,
    stall: Option<Duration>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn page(mut self, at: &str, body: String) -> Self {
        let final_url = Url::parse(&format!("https://agency.example.gov{}", at)).unwrap();
        self.pages.insert(
            at.to_string(),
            FetchResult::Success {
                final_url,
                status_code: 200,
                content_type: "text/html".to_string(),
                body,
            },
        );
        self
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        self.attempts.lock().unwrap().push(url.path().to_string());

        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }

        self.pages
            .get(url.path())
            .cloned()
            .unwrap_or_else(|| FetchResult::NetworkError {
                error: "connection refused".to_string(),
            })
    }
}

/// Store that accepts jobs but rejects every document
struct RejectingStore {
    inner: SqliteStore,
    rejected: AtomicUsize,
}

impl CrawlJobStore for RejectingStore {
    fn insert_job(&self, job: &CrawlJob) -> StorageResult<()> {
        self.inner.insert_job(job)
    }

    fn update_job_status(&self, job: &CrawlJob) -> StorageResult<()> {
        self.inner.update_job_status(job)
    }

    fn insert_document(&self, _document: &Document) -> StorageResult<()> {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Database("disk full".to_string()))
    }
}

const SEED: &str = "https://agency.example.gov/";

fn offline_request(source_id: &str) -> CrawlRequest {
    CrawlRequest::new(source_id, SEED).respect_robots_txt(false)
}

#[tokio::test]
async fn test_submit_returns_before_completion_and_status_is_pollable() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());
    mount_page(&server, "/", page("Notices", "Notice on tariff revision", &["/n1"])).await;
    mount_page(&server, "/n1", page("N1", "Notice one on tariff schedule", &[])).await;

    let (crawler, store) = crawler_with(&test_config());
    let id = crawler.submit(CrawlRequest::new("energy", &seed)).unwrap();

    let snapshot = crawler.status(id).expect("submitted job is known");
    assert_eq!(snapshot.id, id);
    assert_eq!(snapshot.source_id, "energy");
    assert!(store.get_job(id).unwrap().is_some());
    assert_eq!(crawler.jobs().len(), 1);

    let job = tokio::time::timeout(Duration::from_secs(10), crawler.wait(id))
        .await
        .expect("job finishes")
        .unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert_eq!(job.counters.pages_new, 2);

    let persisted = store.get_job(id).unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Done);
    assert_eq!(persisted.counters, job.counters);

    assert_eq!(crawler.status(id).unwrap().status, JobStatus::Done);
    assert!(!crawler.cancel(id));
}

#[tokio::test]
async fn test_invalid_requests_never_create_jobs() {
    let (crawler, _store) = crawler_with(&test_config());

    let zero_budget = crawler.submit(CrawlRequest::new("sec", SEED).max_pages(0));
    assert!(matches!(zero_budget, Err(CrawlError::Config(_))));

    let bad_url = crawler.submit(CrawlRequest::new("sec", "ftp://agency.example.gov/"));
    assert!(matches!(bad_url, Err(CrawlError::Config(_))));

    let no_workers = crawler.submit(CrawlRequest::new("sec", SEED).concurrency(0));
    assert!(matches!(no_workers, Err(CrawlError::Config(_))));

    assert!(crawler.jobs().is_empty());
}

#[tokio::test]
async fn test_unknown_job_queries() {
    let (crawler, _store) = crawler_with(&test_config());
    let id = uuid::Uuid::new_v4();

    assert!(crawler.status(id).is_none());
    assert!(crawler.subscribe(id).is_none());
    assert!(crawler.wait(id).await.is_none());
    assert!(!crawler.cancel(id));
}

#[tokio::test]
async fn test_finished_jobs_can_be_pruned() {
    let fetcher = Arc::new(
        ScriptedFetcher::default().page("/", page("Index", "Directive index", &[])),
    );
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = Crawler::with_fetcher(&test_config(), store.clone(), fetcher).unwrap();

    let done = crawler.run(offline_request("directives")).await.unwrap();

    let updates = crawler.subscribe(done.id).unwrap();
    assert_eq!(updates.borrow().status, JobStatus::Done);
    assert_eq!(crawler.wait(done.id).await.unwrap().counters, done.counters);

    assert_eq!(crawler.prune_finished(), 1);
    assert!(crawler.status(done.id).is_none());
    assert!(crawler.jobs().is_empty());
    assert_eq!(crawler.prune_finished(), 0);

    let persisted = store.get_job(done.id).unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Done);
}

#[tokio::test]
async fn test_cancellation_stops_job_between_pages() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());
    mount_page(&server, "/", page("Index", "Bulletin index", &["/b1", "/b2", "/b3"])).await;
    for at in ["/b1", "/b2", "/b3"] {
        mount_page(&server, at, page(at, &format!("Bulletin {}", at), &[])).await;
    }

    let mut config = test_config();
    config.crawler.request_delay = 10_000;
    let (crawler, store) = crawler_with(&config);

    let id = crawler
        .submit(CrawlRequest::new("bulletins", &seed).max_depth(1))
        .unwrap();

    let mut updates = crawler.subscribe(id).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|job| job.counters.total() >= 1),
    )
    .await
    .expect("seed processed")
    .unwrap();

    assert!(crawler.cancel(id));

    let job = tokio::time::timeout(Duration::from_secs(5), crawler.wait(id))
        .await
        .expect("cancellation is prompt")
        .unwrap();

    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.error_message.as_deref(), Some(CANCELLED_MESSAGE));
    assert_eq!(job.counters.pages_crawled, 1);
    assert_eq!(page_requests(&server).await, 1);
    assert!(!crawler.cancel(id));

    let persisted = store.get_job(id).unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_all_reports_running_jobs() {
    let mut config = test_config();
    config.crawler.request_delay = 10_000;
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("/", page("Index", "Order index", &["/o1", "/o2"])),
    );
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = Crawler::with_fetcher(&config, store, fetcher).unwrap();

    let first = crawler.submit(offline_request("orders").max_depth(1)).unwrap();
    let second = crawler.submit(offline_request("orders-2").max_depth(1)).unwrap();

    assert_eq!(crawler.cancel_all(), 2);
    for id in [first, second] {
        let job = tokio::time::timeout(Duration::from_secs(5), crawler.wait(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
    }
    assert_eq!(crawler.cancel_all(), 0);
}

#[tokio::test]
async fn test_job_with_only_failed_fetches_is_done() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("/", page("Index", "Resolutions index", &["/r1", "/r2", "/r3"])),
    );
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = Crawler::with_fetcher(&test_config(), store.clone(), fetcher.clone()).unwrap();

    let job = crawler
        .run(offline_request("resolutions").max_depth(1))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert!(job.error_message.is_none());
    assert_eq!(job.counters.pages_crawled, 1);
    assert_eq!(job.counters.pages_failed, 3);

    let mut attempts = fetcher.attempts();
    attempts.sort();
    assert_eq!(attempts, vec!["/", "/r1", "/r2", "/r3"]);
    assert_eq!(store.count_documents(job.id).unwrap(), 1);
}

#[tokio::test]
async fn test_slow_fetch_is_bounded_by_fetch_timeout() {
    let mut config = test_config();
    config.crawler.fetch_timeout = 200;
    let fetcher = Arc::new(ScriptedFetcher {
        stall: Some(Duration::from_secs(5)),
        ..ScriptedFetcher::default()
    });
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = Crawler::with_fetcher(&config, store, fetcher).unwrap();

    let job = tokio::time::timeout(
        Duration::from_secs(3),
        crawler.run(offline_request("slow")),
    )
    .await
    .expect("fetch timeout applies")
    .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.counters.pages_failed, 1);
}

#[tokio::test]
async fn test_extraction_timeout_counts_as_failed_page() {
    let mut config = test_config();
    config.crawler.extract_timeout = 1;
    let oversized = page("Gazette", &"<p>Schedule of rates</p>".repeat(200_000), &[]);
    let fetcher = Arc::new(ScriptedFetcher::default().page("/", oversized));
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = Crawler::with_fetcher(&config, store.clone(), fetcher.clone()).unwrap();

    let job = crawler.run(offline_request("gazette")).await.unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert!(job.error_message.is_none());
    assert_eq!(job.counters.pages_failed, 1);
    assert_eq!(job.counters.pages_crawled, 0);
    assert_eq!(fetcher.attempts(), vec!["/"]);
    assert_eq!(store.count_documents(job.id).unwrap(), 0);
}

#[tokio::test]
async fn test_store_failure_fails_the_job() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("/", page("Index", "Advisory index", &["/a1"]))
            .page("/a1", page("A1", "Advisory one", &[])),
    );
    let store = Arc::new(RejectingStore {
        inner: SqliteStore::open_in_memory().unwrap(),
        rejected: AtomicUsize::new(0),
    });
    let crawler = Crawler::with_fetcher(&test_config(), store.clone(), fetcher.clone()).unwrap();

    let job = crawler
        .run(offline_request("advisories").max_depth(1))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error_message.unwrap_or_default();
    assert!(message.contains("disk full"), "unexpected message: {}", message);

    // the first rejected document stops the job before the link is fetched
    assert_eq!(store.rejected.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.attempts(), vec!["/"]);

    let persisted = store.inner.get_job(job.id).unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_source_scope_marks_repeat_content_unchanged() {
    let mut config = test_config();
    config.crawler.dedup_scope = DedupScope::Source;
    let fetcher = Arc::new(
        ScriptedFetcher::default().page("/", page("Index", "Tariff order index", &[])),
    );
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = Crawler::with_fetcher(&config, store.clone(), fetcher).unwrap();

    let first = crawler.run(offline_request("tariffs")).await.unwrap();
    assert_eq!(first.counters.pages_new, 1);

    let second = crawler.run(offline_request("tariffs")).await.unwrap();
    assert_eq!(second.status, JobStatus::Done);
    assert_eq!(second.counters.pages_crawled, 1);
    assert_eq!(second.counters.pages_new, 0);
    assert_eq!(store.count_documents(second.id).unwrap(), 0);

    let other = crawler.run(offline_request("other-source")).await.unwrap();
    assert_eq!(other.counters.pages_new, 1);
}
