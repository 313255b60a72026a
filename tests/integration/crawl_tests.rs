//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, including repeated runs against the
//! same output directory.

use chrono::Utc;
use docmirror::config::{Config, SessionPolicy};
use docmirror::crawler::{crawl, Coordinator, HtmlTransformer, HttpFetcher, QueuedUrl};
use docmirror::storage::{JsonDocument, MetadataStore, SessionState};
use docmirror::{CrawlStatistics, MirrorError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at `<server>/docs`
fn create_test_config(server: &MockServer, output: &Path) -> Config {
    let mut config = Config::new(format!("{}/docs", server.uri()), output);
    config.runtime.politeness_delay_ms = 0;
    config.runtime.concurrency = 2;
    config.runtime.request_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn html(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>\n", href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><main><p>{}</p>\n{}</main></body></html>",
        title, body, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Four in-scope pages plus one external link
///
/// /docs -> /docs/swiftui, /docs/uikit
/// /docs/swiftui -> /docs/swiftui/view, https://example.org/
/// /docs/uikit -> /docs
async fn mount_site(server: &MockServer) {
    mount_site_with_welcome(server, "Welcome").await;
}

async fn mount_site_with_welcome(server: &MockServer, welcome: &str) {
    mount_page(
        server,
        "/docs",
        html("Docs", welcome, &["/docs/swiftui", "/docs/uikit"]),
    )
    .await;
    mount_page(
        server,
        "/docs/swiftui",
        html(
            "SwiftUI",
            "Declarative UI",
            &["/docs/swiftui/view", "https://example.org/"],
        ),
    )
    .await;
    mount_page(server, "/docs/uikit", html("UIKit", "Imperative UI", &["/docs"])).await;
    mount_page(server, "/docs/swiftui/view", html("View", "A view", &[])).await;
}

async fn run(config: &Config) -> CrawlStatistics {
    crawl(config.clone()).await.expect("crawl failed")
}

fn page_url(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}

#[tokio::test]
async fn test_full_crawl_single_tree() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let config = create_test_config(&server, output.path());

    let stats = run(&config).await;

    assert_eq!(stats.total_pages, 4);
    assert_eq!(stats.new_pages, 4);
    assert_eq!(stats.errors, 0);
    assert!(stats.end_time.is_some());

    let store = MetadataStore::open(config.metadata_path()).unwrap();
    assert_eq!(store.page_count(), 4);

    let root = store.page(&page_url(&server, "/docs")).unwrap();
    assert_eq!(root.depth, 0);
    let artifact = std::fs::read_to_string(&root.file_path).unwrap();
    assert!(artifact.starts_with("# Docs"));
    assert!(artifact.contains("Welcome"));

    let view = store.page(&page_url(&server, "/docs/swiftui/view")).unwrap();
    assert_eq!(view.depth, 2);
    assert_eq!(view.framework, "swiftui");
    assert!(view.file_path.starts_with(output.path().canonicalize().unwrap()));
    assert!(view.file_path.is_file());

    assert!(store.page("https://example.org/").is_none());
    assert!(!config.session_path().exists());
}

#[tokio::test]
async fn test_max_pages_one() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&server, output.path());
    config.crawl.max_pages = 1;

    let stats = run(&config).await;

    assert_eq!(stats.total_pages, 1);
    assert_eq!(stats.new_pages, 1);

    let store = MetadataStore::open(config.metadata_path()).unwrap();
    assert_eq!(store.page_count(), 1);
    assert!(store.page(&page_url(&server, "/docs")).is_some());
    assert!(store.metadata().last_crawl.is_some());
    assert!(!config.session_path().exists());
}

#[tokio::test]
async fn test_second_run_skips_unchanged_pages() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let config = create_test_config(&server, output.path());

    run(&config).await;
    let before = MetadataStore::open(config.metadata_path()).unwrap();

    let stats = run(&config).await;

    assert_eq!(stats.skipped_pages, 1);
    assert_eq!(stats.changed_pages(), 0);

    let after = MetadataStore::open(config.metadata_path()).unwrap();
    assert_eq!(before.metadata().pages, after.metadata().pages);
}

#[tokio::test]
async fn test_changed_page_is_updated() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let config = create_test_config(&server, output.path());

    run(&config).await;
    let old_hash = MetadataStore::open(config.metadata_path())
        .unwrap()
        .page(&page_url(&server, "/docs"))
        .unwrap()
        .content_hash
        .clone();

    server.reset().await;
    mount_site_with_welcome(&server, "Welcome back").await;

    let stats = run(&config).await;

    assert_eq!(stats.updated_pages, 1);
    assert_eq!(stats.skipped_pages, 3);
    assert_eq!(stats.total_pages, 4);

    let store = MetadataStore::open(config.metadata_path()).unwrap();
    let root = store.page(&page_url(&server, "/docs")).unwrap();
    assert_ne!(root.content_hash, old_hash);
    assert!(std::fs::read_to_string(&root.file_path)
        .unwrap()
        .contains("Welcome back"));
}

#[tokio::test]
async fn test_deleted_artifact_is_written_again() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let config = create_test_config(&server, output.path());

    run(&config).await;
    let artifact = MetadataStore::open(config.metadata_path())
        .unwrap()
        .page(&page_url(&server, "/docs"))
        .unwrap()
        .file_path
        .clone();
    std::fs::remove_file(&artifact).unwrap();

    let stats = run(&config).await;

    assert_eq!(stats.updated_pages, 1);
    assert!(artifact.is_file());
}

#[tokio::test]
async fn test_disabled_change_detection_rewrites_pages() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&server, output.path());

    run(&config).await;
    config.crawl.change_detection = false;
    let stats = run(&config).await;

    assert_eq!(stats.updated_pages, 4);
    assert_eq!(stats.skipped_pages, 0);
}

#[tokio::test]
async fn test_missing_page_counts_as_error() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/docs",
        html("Docs", "Welcome", &["/docs/missing"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();
    let config = create_test_config(&server, output.path());

    let stats = run(&config).await;

    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.new_pages, 1);
    assert_eq!(stats.errors, 1);

    let store = MetadataStore::open(config.metadata_path()).unwrap();
    assert!(store.page(&page_url(&server, "/docs/missing")).is_none());
}

#[tokio::test]
async fn test_resume_from_saved_session() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let config = create_test_config(&server, output.path());

    let session = SessionState {
        visited: HashSet::from([page_url(&server, "/docs")]),
        queue: vec![QueuedUrl::new(page_url(&server, "/docs/swiftui"), 1)],
        start_url: page_url(&server, "/docs"),
        output_directory: config.crawl.output_directory.clone(),
        saved_at: Utc::now(),
    };
    session.write_to(&config.session_path()).unwrap();

    let stats = run(&config).await;

    // swiftui and the view below it; the root was done before the interruption
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.new_pages, 2);

    let store = MetadataStore::open(config.metadata_path()).unwrap();
    assert!(store.page(&page_url(&server, "/docs")).is_none());
    assert_eq!(
        store
            .page(&page_url(&server, "/docs/swiftui/view"))
            .unwrap()
            .depth,
        2
    );
    assert!(!config.session_path().exists());
}

#[tokio::test]
async fn test_resume_conflict_is_reported() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&server, output.path());

    let session = SessionState {
        visited: HashSet::new(),
        queue: vec![QueuedUrl::new("https://other.example.com/guide", 0)],
        start_url: "https://other.example.com/guide".to_string(),
        output_directory: config.crawl.output_directory.clone(),
        saved_at: Utc::now(),
    };
    session.write_to(&config.session_path()).unwrap();

    let result = crawl(config.clone()).await;
    match result {
        Err(MirrorError::ResumeConflict {
            saved_start_url, ..
        }) => assert_eq!(saved_start_url, "https://other.example.com/guide"),
        other => panic!("expected a resume conflict, got {:?}", other),
    }
    assert!(config.session_path().exists());

    config.crawl.session_policy = SessionPolicy::Fresh;
    let stats = run(&config).await;
    assert_eq!(stats.total_pages, 4);
}

#[tokio::test]
async fn test_interrupted_run_resumes() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();
    let config = create_test_config(&server, output.path());

    let fetcher = Arc::new(HttpFetcher::from_config(&config).unwrap());
    let (_stop_tx, stop_rx) = tokio::sync::watch::channel(true);
    let mut coordinator = Coordinator::new(config.clone(), fetcher, Arc::new(HtmlTransformer))
        .unwrap()
        .with_shutdown(stop_rx);

    let interrupted = coordinator.run().await.unwrap();
    assert!(interrupted.end_time.is_none());
    assert!(config.session_path().exists());

    let stats = run(&config).await;
    assert_eq!(stats.total_pages, 4);
    assert!(stats.end_time.is_some());
    assert!(!config.session_path().exists());
}
