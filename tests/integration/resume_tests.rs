//! Integration tests for checkpoint and resume behaviour
//!
//! A crash is simulated by a store that fails one write; the run aborts
//! without marking the job complete, exactly as a killed process would
//! leave it, and a second crawler picks the job up from disk.

mod common;

use common::*;
use std::sync::Arc;
use sumi_sift::crawler::StopReason;
use sumi_sift::storage::{CheckpointStore, JsonFileStore};
use sumi_sift::SiftError;
use tempfile::TempDir;
use wiremock::MockServer;

/// Paths requested from the server, in order
async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_resume_yields_same_records_as_full_run() {
    // Uninterrupted reference run
    let full_server = MockServer::start().await;
    mount_three_pages(&full_server, [1, 1, 1]).await;
    let full_dir = TempDir::new().unwrap();
    let full_sink = RecordingSink::default();
    crawler(
        test_config(&first_page(&full_server), 5),
        Arc::new(JsonFileStore::new(full_dir.path()).unwrap()),
        full_sink.clone(),
    )
    .run(None)
    .await
    .unwrap();

    // Same site, crashed while journaling the third page
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 1, 2]).await;
    let dir = TempDir::new().unwrap();
    let disk = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let config = test_config(&first_page(&server), 5);

    let crashing = crawler(
        config.clone(),
        Arc::new(FailingStore::new(disk.clone(), FailPoint::Append(3))),
        RecordingSink::default(),
    );
    assert!(matches!(
        crashing.run(None).await,
        Err(SiftError::Storage(_))
    ));

    let sink = RecordingSink::default();
    let outcome = crawler(config, disk.clone(), sink.clone())
        .run(None)
        .await
        .unwrap();

    assert!(outcome.resumed);
    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(outcome.pages_scraped, 3);
    assert_eq!(outcome.items_collected, 5);
    assert_eq!(sink.calls().len(), 1);
    assert_eq!(sink.calls()[0], full_sink.calls()[0]);
}

#[tokio::test]
async fn test_crash_after_checkpoint_resumes_at_next_page() {
    let server = MockServer::start().await;
    // Page 3 is fetched by the crashing run and again after resume
    mount_three_pages(&server, [1, 1, 2]).await;

    let dir = TempDir::new().unwrap();
    let disk = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let config = test_config(&first_page(&server), 5);

    let crashing = crawler(
        config.clone(),
        Arc::new(FailingStore::new(disk.clone(), FailPoint::Append(3))),
        RecordingSink::default(),
    );
    let job_id = crashing.job().job_id.clone();
    assert!(crashing.run(None).await.is_err());

    let state = disk.load(&job_id).unwrap().unwrap();
    assert!(!state.completed);
    assert_eq!(state.pages_scraped, 2);
    assert_eq!(state.items_collected, 4);
    assert!(state.is_consistent());
    assert_eq!(
        state.current_url,
        Some(format!("{}/catalogue/page-3.html", server.uri()))
    );

    let outcome = crawler(config, disk.clone(), RecordingSink::default())
        .run(Some(&job_id))
        .await
        .unwrap();
    assert!(outcome.resumed);
    assert_eq!(outcome.pages_scraped, 3);

    assert_eq!(
        requested_paths(&server).await,
        vec![
            "/catalogue/page-1.html",
            "/catalogue/page-2.html",
            "/catalogue/page-3.html",
            "/catalogue/page-3.html",
        ]
    );
}

#[tokio::test]
async fn test_crash_between_journal_and_state_does_not_duplicate() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 2, 1]).await;

    let dir = TempDir::new().unwrap();
    let disk = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let config = test_config(&first_page(&server), 5);

    // Page 2's records reach the journal, its state save does not
    let crashing = crawler(
        config.clone(),
        Arc::new(FailingStore::new(disk.clone(), FailPoint::Save(2))),
        RecordingSink::default(),
    );
    assert!(crashing.run(None).await.is_err());

    let sink = RecordingSink::default();
    let outcome = crawler(config, disk.clone(), sink.clone())
        .run(None)
        .await
        .unwrap();

    assert_eq!(outcome.items_collected, 5);
    assert_eq!(
        titles(&sink.calls()[0]),
        vec!["Alpha", "Beta", "Gamma", "Delta", "Epsilon"]
    );

    let state = disk.load(&outcome.job_id).unwrap().unwrap();
    assert_eq!(state.pages_scraped as usize, state.urls_scraped.len());
    assert_eq!(disk.load_records(&state).unwrap(), sink.calls()[0]);
}

#[tokio::test]
async fn test_completed_job_reruns_from_scratch() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [2, 2, 2]).await;

    let dir = TempDir::new().unwrap();
    let disk = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let config = test_config(&first_page(&server), 5);

    let first = crawler(config.clone(), disk.clone(), RecordingSink::default())
        .run(None)
        .await
        .unwrap();
    let second = crawler(config, disk.clone(), RecordingSink::default())
        .run(None)
        .await
        .unwrap();

    assert_eq!(first.job_id, second.job_id);
    assert!(!second.resumed);
    assert_eq!(second.pages_scraped, 3);
    assert_eq!(second.records, first.records);
}

#[tokio::test]
async fn test_job_listing_and_deletion() {
    let server = MockServer::start().await;
    mount_three_pages(&server, [1, 1, 1]).await;

    let dir = TempDir::new().unwrap();
    let disk = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let outcome = crawler(
        test_config(&first_page(&server), 5),
        disk.clone(),
        RecordingSink::default(),
    )
    .run(None)
    .await
    .unwrap();

    let jobs = disk.list().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_id, outcome.job_id);

    assert!(disk.delete(&outcome.job_id).unwrap());
    assert!(disk.list().unwrap().is_empty());
    assert!(disk.load(&outcome.job_id).unwrap().is_none());
}
