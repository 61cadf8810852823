//! Crawl requests and their synchronous validation

use crate::config::{validate_seed_url, CrawlerConfig, Source, MAX_CONCURRENCY};
use crate::state::JobConfig;
use crate::ConfigError;
use url::Url;

/// Parameters of one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub source_id: String,
    pub start_url: String,
    pub max_pages: u32,
    pub max_depth: u32,
    pub follow_links: bool,
    pub respect_robots_txt: bool,
    pub concurrency: u32,
}

impl CrawlRequest {
    /// A request using the built-in crawler defaults
    pub fn new(source_id: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self::with_defaults(source_id, start_url, &CrawlerConfig::default())
    }

    /// A request using the budgets and flags of `defaults`
    pub fn with_defaults(
        source_id: impl Into<String>,
        start_url: impl Into<String>,
        defaults: &CrawlerConfig,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            start_url: start_url.into(),
            max_pages: defaults.max_pages,
            max_depth: defaults.max_depth,
            follow_links: defaults.follow_links,
            respect_robots_txt: defaults.respect_robots_txt,
            concurrency: defaults.concurrency,
        }
    }

    /// A request for a configured source
    pub fn for_source(source: &Source, defaults: &CrawlerConfig) -> Self {
        Self::with_defaults(&source.id, &source.url, defaults)
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn respect_robots_txt(mut self, respect: bool) -> Self {
        self.respect_robots_txt = respect;
        self
    }

    pub fn concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Checks the request and returns the parsed seed URL
    ///
    /// A request rejected here never produces a job.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.source_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source_id cannot be empty".to_string(),
            ));
        }

        if self.max_pages < 1 {
            return Err(ConfigError::Validation(format!(
                "max_pages must be >= 1, got {}",
                self.max_pages
            )));
        }

        if self.concurrency < 1 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Validation(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }

        validate_seed_url(&self.start_url)
    }

    /// Configuration snapshot stored on the job
    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            concurrency: self.concurrency,
            follow_links: self.follow_links,
            respect_robots_txt: self.respect_robots_txt,
        }
    }
}
