//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small paginated site and run the
//! full fetch, transform, checkpoint and export cycle against it.

mod common;

use common::*;
use std::sync::Arc;
use sumi_sift::config::{OutputFormat, ScraperConfig};
use sumi_sift::crawler::{run_crawl, StopReason};
use sumi_sift::storage::{CheckpointStore, JsonFileStore, MemoryStore};
use sumi_sift::SiftError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_three_page_chain() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 1, 1]).await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let sink = RecordingSink::default();
    let crawler = crawler(test_config(&first_page(&server), 5), store.clone(), sink.clone());
    let job_id = crawler.job().job_id.clone();

    let outcome = crawler.run(None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(outcome.pages_scraped, 3);
    assert_eq!(outcome.items_collected, 5);
    assert!(!outcome.resumed);

    let state = store.load(&job_id).unwrap().unwrap();
    assert!(state.completed);
    assert!(state.current_url.is_none());
    assert_eq!(state.pages_scraped, 3);
    assert_eq!(state.items_collected, 5);
    assert_eq!(
        state.urls_scraped,
        vec![
            format!("{}/catalogue/page-1.html", server.uri()),
            format!("{}/catalogue/page-2.html", server.uri()),
            format!("{}/catalogue/page-3.html", server.uri()),
        ]
    );

    let calls = sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        titles(&calls[0]),
        vec!["Alpha", "Beta", "Gamma", "Delta", "Epsilon"]
    );
    assert_eq!(calls[0][0].get("link"), Some(Some("/item/alpha")));
}

#[tokio::test]
async fn test_cycle_is_detected() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/catalogue/page-1.html",
        listing(&["Alpha"], Some("page-2.html")),
        1,
    )
    .await;
    mount_page(
        &server,
        "/catalogue/page-2.html",
        listing(&["Beta"], Some("page-1.html")),
        1,
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let sink = RecordingSink::default();
    let crawler = crawler(test_config(&first_page(&server), 10), store.clone(), sink.clone());
    let job_id = crawler.job().job_id.clone();

    let outcome = crawler.run(None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cycle);
    assert_eq!(outcome.pages_scraped, 2);
    assert_eq!(titles(&sink.calls()[0]), vec!["Alpha", "Beta"]);

    let state = store.load(&job_id).unwrap().unwrap();
    assert!(state.completed);
    assert_eq!(state.pages_scraped as usize, state.urls_scraped.len());
}

#[tokio::test]
async fn test_page_budget_is_respected() {
    let server = MockServer::start().await;
    for i in 1..=5 {
        let title = format!("Item{}", i);
        let next = format!("page-{}.html", i + 1);
        mount_page(
            &server,
            &format!("/catalogue/page-{}.html", i),
            listing(&[title.as_str()], Some(next.as_str())),
            if i <= 2 { 1 } else { 0 },
        )
        .await;
    }

    let sink = RecordingSink::default();
    let crawler = crawler(
        test_config(&first_page(&server), 2),
        Arc::new(MemoryStore::new()),
        sink.clone(),
    );

    let outcome = crawler.run(None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::PageBudget);
    assert_eq!(outcome.pages_scraped, 2);
    assert_eq!(titles(&sink.calls()[0]), vec!["Item1", "Item2"]);
}

#[tokio::test]
async fn test_retry_exhaustion_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let sink = RecordingSink::default();
    let crawler = crawler(test_config(&first_page(&server), 5), store.clone(), sink.clone());
    let job_id = crawler.job().job_id.clone();

    let outcome = crawler.run(None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::FetchFailed);
    assert_eq!(outcome.pages_scraped, 0);
    assert!(outcome.export.is_none());
    assert!(sink.calls().is_empty());
    assert!(store.load(&job_id).unwrap().unwrap().completed);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/catalogue/page-1.html",
        listing(&["Alpha"], Some("page-2.html")),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let crawler = crawler(
        test_config(&first_page(&server), 5),
        Arc::new(MemoryStore::new()),
        sink.clone(),
    );

    let outcome = crawler.run(None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::FetchFailed);
    assert_eq!(outcome.pages_scraped, 1);
    assert_eq!(titles(&sink.calls()[0]), vec!["Alpha"]);
}

#[tokio::test]
async fn test_transient_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/catalogue/page-1.html",
        listing(&["Alpha"], None),
        1,
    )
    .await;

    let sink = RecordingSink::default();
    let crawler = crawler(
        test_config(&first_page(&server), 5),
        Arc::new(MemoryStore::new()),
        sink.clone(),
    );

    let outcome = crawler.run(None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(outcome.pages_scraped, 1);
    assert_eq!(titles(&sink.calls()[0]), vec!["Alpha"]);
}

#[tokio::test]
async fn test_empty_pages_do_not_stop_the_crawl() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/catalogue/page-1.html",
        listing(&[], Some("page-2.html")),
        1,
    )
    .await;
    mount_page(&server, "/catalogue/page-2.html", listing(&[], None), 1).await;

    let sink = RecordingSink::default();
    let crawler = crawler(
        test_config(&first_page(&server), 5),
        Arc::new(MemoryStore::new()),
        sink.clone(),
    );

    let outcome = crawler.run(None).await.unwrap();

    assert_eq!(outcome.pages_scraped, 2);
    assert_eq!(outcome.items_collected, 0);
    assert!(outcome.export.is_none());
    assert!(sink.calls().is_empty());
}

#[tokio::test]
async fn test_resume_unknown_job() {
    let server = MockServer::start().await;
    let crawler = crawler(
        test_config(&first_page(&server), 5),
        Arc::new(MemoryStore::new()),
        RecordingSink::default(),
    );

    let result = crawler.run(Some("0000000000000000")).await;
    assert!(matches!(result, Err(SiftError::JobNotFound(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resume_malformed_job_id() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let crawler = crawler(
        test_config(&first_page(&server), 5),
        Arc::new(JsonFileStore::new(dir.path()).unwrap()),
        RecordingSink::default(),
    );

    let result = crawler.run(Some("some/job")).await;
    assert!(matches!(result, Err(SiftError::JobNotFound(id)) if id == "some/job"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resume_completed_job() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 1, 1]).await;

    let store = Arc::new(MemoryStore::new());
    let config = test_config(&first_page(&server), 5);

    let first = crawler(config.clone(), store.clone(), RecordingSink::default());
    let outcome = first.run(None).await.unwrap();

    let second = crawler(config, store.clone(), RecordingSink::default());
    let result = second.run(Some(&outcome.job_id)).await;
    assert!(matches!(result, Err(SiftError::AlreadyCompleted(id)) if id == outcome.job_id));
}

#[tokio::test]
async fn test_store_write_failure_aborts_run() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 1, 0]).await;

    let inner = Arc::new(MemoryStore::new());
    let store = Arc::new(FailingStore::new(inner.clone(), FailPoint::Save(2)));
    let sink = RecordingSink::default();
    let crawler = crawler(test_config(&first_page(&server), 5), store, sink.clone());
    let job_id = crawler.job().job_id.clone();

    let result = crawler.run(None).await;
    assert!(matches!(result, Err(SiftError::Storage(_))));
    assert!(sink.calls().is_empty());

    let state = inner.load(&job_id).unwrap().unwrap();
    assert!(!state.completed);
    assert_eq!(state.pages_scraped, 1);
    assert!(state.current_url.as_deref().unwrap().ends_with("/page-2.html"));
}

#[tokio::test]
async fn test_json_export_from_config() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 1, 1]).await;

    let dir = TempDir::new().unwrap();
    let mut config: ScraperConfig = test_config(&first_page(&server), 5);
    config.output.format = OutputFormat::Json;
    config.output.path = dir.path().join("out/books").to_string_lossy().into_owned();
    config.resume.checkpoint_dir = dir.path().join("state").to_string_lossy().into_owned();

    let outcome = run_crawl(config, None).await.unwrap();

    let report = outcome.export.unwrap();
    assert_eq!(report.destination, dir.path().join("out/books.json"));
    assert_eq!(report.records, 5);

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.destination).unwrap()).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 5);
    assert_eq!(exported[4]["title"], "Epsilon");

    let store = JsonFileStore::new(dir.path().join("state")).unwrap();
    let state = store.load(&outcome.job_id).unwrap().unwrap();
    assert!(state.completed);
}

#[tokio::test]
async fn test_checkpointing_can_be_disabled() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 1, 1]).await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&first_page(&server), 5);
    config.resume.enabled = false;
    config.resume.checkpoint_dir = dir.path().join("state").to_string_lossy().into_owned();
    config.output.path = dir.path().join("data").to_string_lossy().into_owned();

    let outcome = run_crawl(config, None).await.unwrap();

    assert_eq!(outcome.pages_scraped, 3);
    assert!(!dir.path().join("state").exists());
    assert!(dir.path().join("data.csv").exists());
}
