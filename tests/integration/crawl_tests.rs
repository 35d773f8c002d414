//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use jsfinder::config::Config;
use jsfinder::crawler::{build_http_client, fetch_page, run_crawl, Crawler};
use jsfinder::output::MemorySink;
use jsfinder::{retry, ErrorKind, RetryConfig, TimeoutConfig, TimeoutManager};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with fast, deterministic retries
fn create_test_config(max_depth: u32, threads: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.threads = threads;
    config.retry.max_attempts = Some(3);
    config.retry.initial_delay_ms = Some(10);
    config.retry.max_delay_ms = Some(50);
    config.retry.jitter = Some(false);
    config
}

/// Mounts an HTML page expected to be fetched exactly `times` times
async fn mount_page(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}

fn sorted(mut lines: Vec<String>) -> Vec<String> {
    lines.sort();
    lines
}

#[tokio::test]
async fn test_same_origin_crawl_with_external_link() {
    let site = MockServer::start().await;
    let other = MockServer::start().await;
    let base = site.uri();

    mount_page(
        &site,
        "/",
        format!(
            r#"<html><head><script src="/a.js"></script></head><body>
            <a href="/p2">Page 2</a>
            <a href="{}/p">Elsewhere</a>
            </body></html>"#,
            other.uri()
        ),
        1,
    )
    .await;
    mount_page(&site, "/p2", "<html><body>Page 2</body></html>".to_string(), 1).await;

    // The external origin must never be contacted
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&other)
        .await;

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::with_sink(create_test_config(1, 5), sink.clone()).unwrap();
    let report = crawler.crawl_domain(&base).await.unwrap();
    crawler.shutdown().await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(sink.lines(), vec![format!("{}/a.js", base)]);
    assert_eq!(crawler.resources(), sink.lines());
}

#[tokio::test]
async fn test_no_page_fetched_twice() {
    let site = MockServer::start().await;
    let base = site.uri();

    // Every page links to every other page, with duplicates and fragments
    let links = r##"
        <a href="/">home</a>
        <a href="/a">a</a><a href="/a#top">a again</a><a href="/a">a thrice</a>
        <a href="/b">b</a><a href="/b?">b with empty query</a>
        <a href="/c">c</a>
    "##;
    for route in ["/", "/a", "/b", "/c"] {
        mount_page(&site, route, links.to_string(), 1).await;
    }

    let crawler = Crawler::with_sink(create_test_config(5, 8), Arc::new(MemorySink::new())).unwrap();
    let report = crawler.crawl_domain(&base).await.unwrap();
    crawler.shutdown().await;

    assert_eq!(report.pages_fetched, 4);
    // Mock expectations verify exactly one request per page on drop
}

#[tokio::test]
async fn test_depth_cutoff_is_inclusive() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount_page(&site, "/", r#"<a href="/d1">1</a>"#.to_string(), 1).await;
    mount_page(&site, "/d1", r#"<a href="/d2">2</a>"#.to_string(), 1).await;
    mount_page(
        &site,
        "/d2",
        r#"<script src="/deep.js"></script><a href="/d3">3</a>"#.to_string(),
        1,
    )
    .await;
    mount_page(&site, "/d3", "<p>too deep</p>".to_string(), 0).await;

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::with_sink(create_test_config(2, 4), sink.clone()).unwrap();
    let report = crawler.crawl_domain(&base).await.unwrap();
    crawler.shutdown().await;

    assert_eq!(report.pages_fetched, 3);
    // Resources on the last allowed level are still recorded
    assert_eq!(sink.lines(), vec![format!("{}/deep.js", base)]);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_threads() {
    let site = MockServer::start().await;
    let base = site.uri();

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/page{i}">{i}</a>"#))
        .collect();
    mount_page(&site, "/", links, 1).await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>leaf</p>")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&site)
        .await;

    let crawler = Crawler::with_sink(create_test_config(1, 3), Arc::new(MemorySink::new())).unwrap();
    let report = crawler.crawl_domain(&base).await.unwrap();
    crawler.shutdown().await;

    assert_eq!(report.pages_fetched, 21);
    assert!(report.peak_in_flight >= 1);
    assert!(report.peak_in_flight <= 3, "peak was {}", report.peak_in_flight);
    assert!(crawler.peak_in_flight() <= 3);
}

#[tokio::test]
async fn test_server_error_retried_until_exhausted() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount_page(
        &site,
        "/",
        r#"<a href="/broken">broken</a><a href="/ok">ok</a>"#.to_string(),
        1,
    )
    .await;
    mount_page(&site, "/ok", r#"<script src="/ok.js"></script>"#.to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&site)
        .await;

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::with_sink(create_test_config(1, 2), sink.clone()).unwrap();
    let report = crawler.crawl_domain(&base).await.unwrap();
    crawler.shutdown().await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(sink.lines(), vec![format!("{}/ok.js", base)]);

    let stats = crawler.retry_stats();
    assert_eq!(stats.total_operations, 3);
    assert_eq!(stats.failed_operations, 1);
    assert_eq!(stats.max_attempts, 3);
    assert_eq!(stats.total_retries, 2);
}

#[tokio::test]
async fn test_client_error_not_retried_with_server_errors_policy() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount_page(&site, "/", r#"<a href="/gone">gone</a>"#.to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&site)
        .await;

    let mut config = create_test_config(1, 2);
    config.retry.http_status_policy = jsfinder::retry::HttpStatusPolicy::ServerErrors;

    let crawler = Crawler::with_sink(config, Arc::new(MemorySink::new())).unwrap();
    let report = crawler.crawl_domain(&base).await.unwrap();
    crawler.shutdown().await;

    assert_eq!(report.pages_failed, 1);
}

#[tokio::test]
async fn test_operation_timeout_cancels_slow_page_only() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount_page(
        &site,
        "/",
        r#"<a href="/slow">slow</a><a href="/fast">fast</a>"#.to_string(),
        1,
    )
    .await;
    mount_page(&site, "/fast", r#"<script src="/fast.js"></script>"#.to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<script src="/slow.js"></script>"#)
                .set_delay(Duration::from_secs(2)),
        )
        .expect(1)
        .mount(&site)
        .await;

    let mut config = create_test_config(1, 4);
    config.timeouts.operation_timeout_secs = Some(1);

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::with_sink(config, sink.clone()).unwrap();
    let report = crawler.crawl_domain(&base).await.unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 1);
    assert!(!report.cancelled);
    assert!(report.duration < Duration::from_secs(2));
    assert_eq!(sink.lines(), vec![format!("{}/fast.js", base)]);
    assert_eq!(crawler.timeouts().active_operations(), 0);

    crawler.shutdown().await;
}

#[tokio::test]
async fn test_operation_deadline_ends_retry_with_timeout_kind() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&site)
        .await;

    let config = create_test_config(1, 1);
    let client = build_http_client(&config.crawler).unwrap();
    let url = url::Url::parse(&format!("{}/slow", site.uri())).unwrap();

    let manager = TimeoutManager::new(TimeoutConfig::default());
    let op = manager.create_operation("slow-page", Some(Duration::from_secs(1)));
    let retry_config = RetryConfig::network()
        .with_max_attempts(3)
        .with_initial_delay(Duration::from_millis(10))
        .with_jitter(false);

    let result = retry(op.token(), &retry_config, |_, _| fetch_page(&client, &url)).await;

    assert!(!result.succeeded);
    assert_eq!(result.attempts_made, 1);
    let err = result.last_error.expect("deadline error");
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(result.elapsed < Duration::from_secs(2));
    tokio::time::timeout(Duration::from_millis(500), op.finished())
        .await
        .expect("deadline should have finished the operation");
    assert_eq!(manager.active_operations(), 0);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_resources_written_once_to_file() {
    let site = MockServer::start().await;
    let base = site.uri();

    let page = r#"
        <script src="/shared.js"></script>
        <script src="/shared.js?v=2"></script>
        <a href="/one">1</a><a href="/two">2</a>
    "#;
    mount_page(&site, "/", page.to_string(), 1).await;
    mount_page(&site, "/one", page.to_string(), 1).await;
    mount_page(&site, "/two", page.to_string(), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("js.txt");

    let mut config = create_test_config(2, 3);
    config.output.path = Some(out.clone());

    let reports = run_crawl(config, Some(base.clone())).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].resources_discovered, 2);

    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    assert_eq!(
        sorted(lines),
        vec![format!("{}/shared.js", base), format!("{}/shared.js?v=2", base)]
    );
}

#[tokio::test]
async fn test_unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(1, 1);
    config.output.path = Some(dir.path().join("missing/dir/js.txt"));

    let result = run_crawl(config, Some("https://x.test".to_string())).await;
    assert!(matches!(result, Err(jsfinder::FinderError::Output { .. })));
}

#[tokio::test]
async fn test_unreachable_seed_is_not_fatal() {
    // Bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = create_test_config(1, 1);
    config.retry.max_attempts = Some(2);

    let crawler = Crawler::with_sink(config, Arc::new(MemorySink::new())).unwrap();
    let report = crawler
        .crawl_domain(&format!("http://{}/", addr))
        .await
        .unwrap();
    crawler.shutdown().await;

    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(crawler.retry_stats().total_attempts, 2);
}
