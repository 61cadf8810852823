use regcrawl::config::{Config, CrawlerConfig, ExtractorConfig, OutputConfig, UserAgentConfig};
use regcrawl::storage::SqliteStore;
use regcrawl::Crawler;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test configuration: no politeness delay, short timeouts
pub fn test_config() -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay: 0,
            fetch_timeout: 2000,
            robots_timeout: 500,
            extract_timeout: 2000,
            progress_interval: 1,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: ":memory:".to_string(),
        },
        extractor: ExtractorConfig::default(),
        sources: vec![],
    }
}

/// Crawler over a fresh in-memory store
pub fn crawler_with(config: &Config) -> (Crawler, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = Crawler::new(config, store.clone()).unwrap();
    (crawler, store)
}

/// A minimal HTML page whose main text is `text`
pub fn page(title: &str, text: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{}</title></head>
<body>
<nav><a href="/">Home</a></nav>
<main><p>{}</p>
{}
</main>
</body>
</html>"#,
        title, text, anchors
    )
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

pub async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .mount(server)
        .await;
}

pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Number of requests the server received for `at`
pub async fn requests_to(server: &MockServer, at: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == at)
        .count()
}

/// Number of page requests (everything but robots.txt)
pub async fn page_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() != "/robots.txt")
        .count()
}
