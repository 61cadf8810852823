use crate::dedup::DedupScope;
use crate::extract::{
    DEFAULT_ANNOUNCEMENT_SELECTORS, DEFAULT_CONTENT_SELECTORS, DEFAULT_EXCLUDE_SELECTORS,
    DEFAULT_MIN_ANNOUNCEMENT_LENGTH,
};
use crate::url::LinkScope;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<Source>,
}

impl Config {
    /// Looks up a configured source by id
    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Sources with `active = true`
    pub fn active_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.active)
    }
}

/// Crawler defaults and politeness settings
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Default page budget per job
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Default maximum link depth from the seed (seed = 0)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Default number of workers per job
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Whether discovered links are followed by default
    #[serde(rename = "follow-links", default = "default_true")]
    pub follow_links: bool,

    /// Whether robots.txt is consulted by default
    #[serde(rename = "respect-robots-txt", default = "default_true")]
    pub respect_robots_txt: bool,

    /// Minimum time between requests to the same origin (milliseconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// Page fetch timeout (milliseconds)
    #[serde(rename = "fetch-timeout", default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// robots.txt fetch timeout (milliseconds)
    #[serde(rename = "robots-timeout", default = "default_robots_timeout")]
    pub robots_timeout: u64,

    /// Content extraction timeout (milliseconds)
    #[serde(rename = "extract-timeout", default = "default_extract_timeout")]
    pub extract_timeout: u64,

    /// Pages between persisted progress updates
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u32,

    #[serde(rename = "dedup-scope", default)]
    pub dedup_scope: DedupScope,

    #[serde(rename = "link-scope", default)]
    pub link_scope: LinkScope,

    /// Extra domain patterns (e.g. "*.example.gov") links may stay on
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_millis(self.robots_timeout)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_millis(self.extract_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
            follow_links: true,
            respect_robots_txt: true,
            request_delay: default_request_delay(),
            fetch_timeout: default_fetch_timeout(),
            robots_timeout: default_robots_timeout(),
            extract_timeout: default_extract_timeout(),
            progress_interval: default_progress_interval(),
            dedup_scope: DedupScope::default(),
            link_scope: LinkScope::default(),
            allowed_domains: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite job store
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Selector configuration for content extraction
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Ordered main-content candidates; the first match wins
    #[serde(rename = "content-selectors", default = "default_content_selectors")]
    pub content_selectors: Vec<String>,

    /// Elements removed from the main content before text extraction
    #[serde(rename = "exclude-selectors", default = "default_exclude_selectors")]
    pub exclude_selectors: Vec<String>,

    /// Elements collected as announcement snippets
    #[serde(
        rename = "announcement-selectors",
        default = "default_announcement_selectors"
    )]
    pub announcement_selectors: Vec<String>,

    /// Snippets must be longer than this many characters
    #[serde(
        rename = "min-announcement-length",
        default = "default_min_announcement_length"
    )]
    pub min_announcement_length: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            content_selectors: default_content_selectors(),
            exclude_selectors: default_exclude_selectors(),
            announcement_selectors: default_announcement_selectors(),
            min_announcement_length: default_min_announcement_length(),
        }
    }
}

/// A crawl target
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub id: String,

    /// Seed URL
    pub url: String,

    /// Source type, e.g. "news", "policy" or "exchange"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub sector: Option<String>,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> u32 {
    50
}

fn default_max_depth() -> u32 {
    2
}

fn default_concurrency() -> u32 {
    3
}

fn default_request_delay() -> u64 {
    1000
}

fn default_fetch_timeout() -> u64 {
    30_000
}

fn default_robots_timeout() -> u64 {
    5000
}

fn default_extract_timeout() -> u64 {
    10_000
}

fn default_progress_interval() -> u32 {
    10
}

fn to_strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn default_content_selectors() -> Vec<String> {
    to_strings(DEFAULT_CONTENT_SELECTORS)
}

fn default_exclude_selectors() -> Vec<String> {
    to_strings(DEFAULT_EXCLUDE_SELECTORS)
}

fn default_announcement_selectors() -> Vec<String> {
    to_strings(DEFAULT_ANNOUNCEMENT_SELECTORS)
}

fn default_min_announcement_length() -> usize {
    DEFAULT_MIN_ANNOUNCEMENT_LENGTH
}
