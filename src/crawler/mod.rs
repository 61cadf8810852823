//! Crawler module: crawl jobs from request to terminal status
//!
//! This module contains the core crawling logic, including:
//! - the job manager (`Crawler`) that submits, observes and cancels jobs
//! - the per-job coordinator and its worker pool
//! - the breadth-first frontier with its page and depth budgets
//! - per-origin politeness scheduling
//! - the HTTP fetch boundary

mod coordinator;
mod fetcher;
mod frontier;
mod manager;
mod request;
mod scheduler;

pub use coordinator::{PageResult, CANCELLED_MESSAGE};
pub use fetcher::{build_http_client, fetch_url, FetchResult, HttpFetcher, PageFetcher, MAX_REDIRECTS};
pub use frontier::{Frontier, FrontierEntry};
pub use manager::Crawler;
pub use request::CrawlRequest;
pub use scheduler::Scheduler;
