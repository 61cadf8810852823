//! End-to-end traversal behavior

use crate::common::*;
use regcrawl::{CrawlRequest, JobStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_depth_one_crawl_visits_each_link_once() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_page(
        &server,
        "/",
        page(
            "Circulars",
            "Index of circulars issued this year",
            &["/a", "/b", "/c", "/a", "/b#section-2"],
        ),
    )
    .await;
    for (at, text) in [
        ("/a", "Circular A on reserve requirements"),
        ("/b", "Circular B on reporting formats"),
        ("/c", "Circular C on digital lending"),
    ] {
        mount_page(&server, at, page(at, text, &[format!("{}/deeper", at).as_str()])).await;
    }

    let config = test_config();
    let (crawler, store) = crawler_with(&config);
    let job = crawler
        .run(
            CrawlRequest::new("cbank", &seed)
                .max_pages(10)
                .max_depth(1)
                .concurrency(2),
        )
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert!(job.error_message.is_none());
    assert_eq!(job.counters.pages_crawled, 4);
    assert_eq!(job.counters.pages_new, 4);
    assert_eq!(job.counters.pages_failed, 0);
    assert_eq!(job.counters.pages_skipped, 0);

    assert_eq!(page_requests(&server).await, 4);
    for at in ["/", "/a", "/b", "/c"] {
        assert_eq!(requests_to(&server, at).await, 1, "{} fetched once", at);
    }
    for at in ["/a/deeper", "/b/deeper", "/c/deeper"] {
        assert_eq!(requests_to(&server, at).await, 0, "{} is beyond max depth", at);
    }

    assert_eq!(store.count_documents(job.id).unwrap(), 4);
}

#[tokio::test]
async fn test_page_budget_of_one_fetches_only_the_seed() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_page(
        &server,
        "/",
        page("Home", "Press releases", &["/1", "/2", "/3", "/4", "/5"]),
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(html(page("Other", "Other page", &[])))
        .mount(&server)
        .await;

    let (crawler, _store) = crawler_with(&test_config());
    let job = crawler
        .run(CrawlRequest::new("press", &seed).max_pages(1).concurrency(4))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(page_requests(&server).await, 1);
    assert_eq!(job.counters.pages_crawled, 1);
}

#[tokio::test]
async fn test_no_follow_fetches_only_the_seed() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_page(&server, "/", page("Home", "Notices", &["/a", "/b"])).await;

    let (crawler, _store) = crawler_with(&test_config());
    let job = crawler
        .run(CrawlRequest::new("notices", &seed).follow_links(false))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(page_requests(&server).await, 1);
}

#[tokio::test]
async fn test_failed_pages_do_not_fail_the_job() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_page(
        &server,
        "/",
        page("Home", "Advisories", &["/down", "/missing", "/report.pdf"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;
    // "/missing" falls through to wiremock's default 404

    let (crawler, store) = crawler_with(&test_config());
    let job = crawler
        .run(CrawlRequest::new("advisories", &seed).max_depth(1))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.counters.pages_crawled, 1);
    assert_eq!(job.counters.pages_failed, 3);
    assert_eq!(store.count_documents(job.id).unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_content_is_skipped_not_stored() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_page(&server, "/", page("Home", "Tariff orders", &["/v1", "/v2"])).await;
    // Same main text, different chrome
    mount_page(&server, "/v1", page("Order 12", "Tariff order 12 text", &[])).await;
    mount_page(
        &server,
        "/v2",
        page("Order 12 (print view)", "Tariff   order 12\ntext", &[]),
    )
    .await;

    let (crawler, store) = crawler_with(&test_config());
    let job = crawler
        .run(
            CrawlRequest::new("tariffs", &seed)
                .max_depth(1)
                .concurrency(1),
        )
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.counters.pages_crawled, 2);
    assert_eq!(job.counters.pages_new, 2);
    assert_eq!(job.counters.pages_skipped, 1);

    let urls = store.document_urls(job.id).unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls[1].ends_with("/v1"));
}

#[tokio::test]
async fn test_links_to_other_hosts_are_not_followed() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    // Same loopback interface, different host name
    let external = format!("http://localhost:{}/elsewhere", other.address().port());
    mount_page(&server, "/", page("Home", "Bulletins", &["/local", external.as_str()])).await;
    mount_page(&server, "/local", page("Local", "Local bulletin", &[])).await;
    Mock::given(method("GET"))
        .respond_with(html(page("Elsewhere", "Should not be fetched", &[])))
        .expect(0)
        .mount(&other)
        .await;

    let (crawler, _store) = crawler_with(&test_config());
    let job = crawler
        .run(CrawlRequest::new("bulletins", &seed).max_depth(1))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.counters.pages_crawled, 2);
    assert_eq!(requests_to(&server, "/local").await, 1);
}

#[tokio::test]
async fn test_documents_carry_extracted_content() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Master Circular on KYC</title>
        <meta name="description" content="KYC norms"></head>
        <body><main><p>Regulated entities shall update records.</p>
        <table><tr><th>Para</th></tr><tr><td>3.1</td></tr></table></main></body></html>"#
            .to_string(),
    )
    .await;

    let (crawler, store) = crawler_with(&test_config());
    let job = crawler
        .run(CrawlRequest::new("kyc", &seed))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(store.count_documents(job.id).unwrap(), 1);
    assert_eq!(store.document_urls(job.id).unwrap(), vec![seed]);
}

#[tokio::test]
async fn test_mixed_outcomes_stay_within_page_budget() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;
    mount_page(
        &server,
        "/",
        page(
            "Rulings",
            "Index of rulings",
            &[
                "/ok1",
                "/missing",
                "/private/x",
                "/dup",
                "/ok2",
                "/ok3",
                "/ok4",
            ],
        ),
    )
    .await;
    mount_page(&server, "/ok1", page("Ruling 1", "Ruling one text", &[])).await;
    mount_page(&server, "/dup", page("Ruling 1 copy", "Ruling one text", &[])).await;
    for at in ["/ok2", "/ok3", "/ok4"] {
        mount_page(&server, at, page(at, &format!("Ruling {}", at), &[])).await;
    }

    let (crawler, store) = crawler_with(&test_config());
    let job = crawler
        .run(
            CrawlRequest::new("rulings", &seed)
                .max_pages(5)
                .max_depth(1)
                .concurrency(4),
        )
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Done);
    let counters = job.counters;
    assert_eq!(counters.total(), 5);
    assert!(counters.pages_crawled + counters.pages_failed + counters.pages_skipped <= 5);
    assert_eq!(counters.pages_crawled, 2);
    assert_eq!(counters.pages_new, 2);
    assert_eq!(counters.pages_failed, 1);
    assert_eq!(counters.pages_skipped, 2);

    // the disallowed entry is dequeued but never fetched
    assert_eq!(page_requests(&server).await, 4);
    for at in ["/ok2", "/ok3", "/ok4"] {
        assert_eq!(requests_to(&server, at).await, 0, "{} is beyond the budget", at);
    }
    assert_eq!(store.count_documents(job.id).unwrap(), 2);
}
