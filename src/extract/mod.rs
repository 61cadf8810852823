//! Content extraction from fetched HTML
//!
//! Turns a raw page into structured content:
//! - main text from the first matching content selector, with boilerplate
//!   elements (script/style/nav/footer/header/iframe/noscript) removed
//! - data tables, `<meta>` tags and announcement-like snippets
//! - outbound links resolved against the page URL
//!
//! Extraction is a pure function of the HTML and the selector configuration.

mod links;
mod tables;
mod text;

pub use links::{extract_links, resolve_link};
pub use tables::{extract_tables, Table};
pub use text::normalize_whitespace;

use crate::config::{validate_selectors, ExtractorConfig};
use crate::ConfigError;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use url::Url;

pub const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    ".main-content",
    "#main-content",
    ".content",
    "#content",
    ".post-content",
    ".entry-content",
];

pub const DEFAULT_EXCLUDE_SELECTORS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "iframe", "noscript",
];

pub const DEFAULT_ANNOUNCEMENT_SELECTORS: &[&str] = &[
    ".announcement",
    ".alert",
    ".notice",
    "[class*='announcement']",
    "[class*='alert']",
];

pub const DEFAULT_MIN_ANNOUNCEMENT_LENGTH: usize = 20;

/// Terms that mark a page as worth classifying downstream
pub const REGULATORY_KEYWORDS: &[&str] = &[
    "circular",
    "order",
    "resolution",
    "memorandum",
    "advisory",
    "regulation",
    "policy",
    "issuance",
    "directive",
    "guideline",
    "announcement",
    "notice",
    "press release",
    "bulletin",
    "tariff",
    "rate",
    "compliance",
    "requirement",
];

/// Characters of main text inspected by the relevance pre-filter
const RELEVANCE_WINDOW: usize = 1000;

/// Structured content of one page
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub title: Option<String>,

    /// Whitespace-normalized main text; the basis for fingerprinting
    pub text: String,

    pub tables: Vec<Table>,

    /// `name`/`property` attribute -> `content`
    pub metadata: BTreeMap<String, String>,

    pub announcements: Vec<String>,

    /// Absolute outbound links, in document order
    pub links: Vec<Url>,
}

impl PageContent {
    pub fn is_likely_relevant(&self) -> bool {
        is_likely_relevant(self)
    }
}

/// Content extractor with pre-compiled selectors
#[derive(Debug)]
pub struct ContentExtractor {
    content: Vec<Selector>,
    exclude: Vec<Selector>,
    announcements: Vec<Selector>,
    min_announcement_length: usize,
}

impl ContentExtractor {
    /// Compiles the selector configuration
    pub fn new(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        validate_selectors(&config.content_selectors)?;
        validate_selectors(&config.exclude_selectors)?;
        validate_selectors(&config.announcement_selectors)?;

        Ok(Self {
            content: compile(&config.content_selectors),
            exclude: compile(&config.exclude_selectors),
            announcements: compile(&config.announcement_selectors),
            min_announcement_length: config.min_announcement_length,
        })
    }

    /// Extracts structured content from `html`, resolving links against `page_url`
    pub fn extract(&self, html: &str, page_url: &Url) -> PageContent {
        let document = Html::parse_document(html);

        let main = text::find_main(&document, &self.content);
        let main_text = text::sanitized_text(main, &self.exclude);

        PageContent {
            title: text::extract_title(&document),
            text: main_text,
            tables: extract_tables(&document),
            metadata: extract_metadata(&document),
            announcements: self.extract_announcements(&document),
            links: extract_links(&document, page_url),
        }
    }

    fn extract_announcements(&self, document: &Html) -> Vec<String> {
        let mut snippets: Vec<String> = Vec::new();

        for selector in &self.announcements {
            for element in document.select(selector) {
                let snippet = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
                if snippet.chars().count() > self.min_announcement_length
                    && !snippets.contains(&snippet)
                {
                    snippets.push(snippet);
                }
            }
        }

        snippets
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        let config = ExtractorConfig::default();
        Self {
            content: compile(&config.content_selectors),
            exclude: compile(&config.exclude_selectors),
            announcements: compile(&config.announcement_selectors),
            min_announcement_length: config.min_announcement_length,
        }
    }
}

fn compile(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

/// Collects every `<meta>` with a `name` or `property` and a `content`
///
/// The first occurrence of a key wins.
pub fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    let Ok(meta_selector) = Selector::parse("meta") else {
        return metadata;
    };

    for element in document.select(&meta_selector) {
        let attrs = element.value();
        let key = attrs.attr("name").or_else(|| attrs.attr("property"));
        if let (Some(key), Some(content)) = (key, attrs.attr("content")) {
            metadata
                .entry(key.to_string())
                .or_insert_with(|| content.trim().to_string());
        }
    }

    metadata
}

/// Cheap relevance pre-filter over the title and the start of the main text
pub fn is_likely_relevant(content: &PageContent) -> bool {
    let head: String = content.text.chars().take(RELEVANCE_WINDOW).collect();
    let haystack = format!(
        "{} {}",
        content.title.as_deref().unwrap_or_default(),
        head
    )
    .to_lowercase();

    REGULATORY_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}
