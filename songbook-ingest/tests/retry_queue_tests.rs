//! Retry queue and dead-letter archive persistence tests

mod helpers;

use helpers::{test_queue, FailingDocumentStore};
use serde_json::Value;
use songbook_ingest::models::{ArchiveDocument, QueueDocument, SongCandidate, SongKey};
use songbook_ingest::services::{EnqueueOutcome, JsonFileStore, RetryQueue, RETRY_THRESHOLD};
use songbook_ingest::IngestError;
use std::sync::Arc;
use tempfile::TempDir;

fn candidate() -> SongCandidate {
    SongCandidate::new("Black", "Pearl Jam", "314").with_source_url("https://songs.example/tab/314")
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_retry_count_matches_failures_below_threshold() {
    let root = TempDir::new().unwrap();
    let queue = test_queue(root.path());

    for k in 1..RETRY_THRESHOLD {
        let outcome = queue.enqueue_failure(&candidate(), "rejected").await.unwrap();
        assert_eq!(outcome, EnqueueOutcome::Queued { retry_count: k });

        let pending = queue.drain().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, k);
        assert!(queue.dead_letters().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_threshold_moves_key_to_archive_once() {
    let root = TempDir::new().unwrap();
    let queue = test_queue(root.path());

    let mut outcomes = Vec::new();
    for _ in 0..RETRY_THRESHOLD {
        outcomes.push(queue.enqueue_failure(&candidate(), "rejected").await.unwrap());
    }

    match outcomes.last() {
        Some(EnqueueOutcome::DeadLettered(entry)) => {
            assert_eq!(entry.final_retry_count, 5);
            assert_eq!(entry.key(), candidate().key());
            assert_eq!(entry.last_error.as_deref(), Some("rejected"));
        }
        other => panic!("Expected DeadLettered, got {:?}", other),
    }

    assert!(queue.drain().await.unwrap().is_empty());
    assert_eq!(queue.dead_letters().await.unwrap().len(), 1);

    // Further failures never duplicate the archive entry or re-queue the key
    let again = queue.enqueue_failure(&candidate(), "rejected").await.unwrap();
    assert_eq!(again, EnqueueOutcome::AlreadyDeadLettered);
    assert!(queue.drain().await.unwrap().is_empty());
    assert_eq!(queue.dead_letters().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_keys_are_tracked_independently() {
    let root = TempDir::new().unwrap();
    let queue = test_queue(root.path());
    let other = SongCandidate::new("Black", "Pearl Jam", "999");

    queue.enqueue_failure(&candidate(), "x").await.unwrap();
    queue.enqueue_failure(&candidate(), "x").await.unwrap();
    queue.enqueue_failure(&other, "x").await.unwrap();

    let pending = queue.drain().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].retry_count, 2);
    assert_eq!(pending[1].retry_count, 1);

    assert!(queue.remove(&other.key()).await.unwrap());
    assert_eq!(queue.size().await.unwrap(), 1);
    assert_eq!(queue.drain().await.unwrap()[0].key(), candidate().key());
}

#[tokio::test]
async fn test_documents_are_readable_json_with_summary() {
    let root = TempDir::new().unwrap();
    let queue = test_queue(root.path());

    queue.enqueue_failure(&candidate(), "rejected").await.unwrap();

    let raw = std::fs::read_to_string(root.path().join("retry_queue.json")).unwrap();
    assert!(raw.contains("\n  \"entries\""), "queue document should be pretty-printed");

    let doc = read_json(&root.path().join("retry_queue.json"));
    assert_eq!(doc["entries"][0]["artist"], "Pearl Jam");
    assert_eq!(doc["entries"][0]["title"], "Black");
    assert_eq!(doc["entries"][0]["external_id"], "314");
    assert_eq!(doc["entries"][0]["retry_count"], 1);
    assert!(doc["summary"].as_str().unwrap().starts_with("1 pending entry"));

    for _ in 1..RETRY_THRESHOLD {
        queue.enqueue_failure(&candidate(), "rejected").await.unwrap();
    }

    let archive = read_json(&root.path().join("dead_letter.json"));
    assert_eq!(archive["entries"][0]["final_retry_count"], 5);
    assert!(archive["entries"][0]["last_attempt_date"].is_string());
    assert!(archive["summary"].is_string());

    let emptied = read_json(&root.path().join("retry_queue.json"));
    assert_eq!(emptied["entries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_queue_survives_reopen() {
    let root = TempDir::new().unwrap();

    test_queue(root.path())
        .enqueue_failure(&candidate(), "rejected")
        .await
        .unwrap();

    let reopened = test_queue(root.path());
    let pending = reopened.drain().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].to_candidate().source_url.as_deref(),
        Some("https://songs.example/tab/314")
    );
}

#[tokio::test]
async fn test_entries_without_snapshot_are_accepted() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("retry_queue.json"),
        r#"{"entries": [{"artist": "Pearl Jam", "title": "Black", "external_id": "314", "retry_count": 3}], "summary": ""}"#,
    )
    .unwrap();
    let queue = test_queue(root.path());

    let pending = queue.drain().await.unwrap();
    assert_eq!(pending[0].to_candidate().key(), SongKey::new("Pearl Jam", "Black", "314"));

    let outcome = queue.enqueue_failure(&candidate(), "rejected").await.unwrap();
    assert_eq!(outcome, EnqueueOutcome::Queued { retry_count: 4 });
}

#[tokio::test]
async fn test_corrupt_queue_document_is_reported() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("retry_queue.json"), "{ entries: oops").unwrap();
    let queue = test_queue(root.path());

    let result = queue.size().await;
    assert!(matches!(result, Err(IngestError::Document(_))));
}

#[tokio::test]
async fn test_key_in_both_documents_is_dropped_from_queue() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("retry_queue.json"),
        r#"{"entries": [
            {"artist": "Pearl Jam", "title": "Black", "external_id": "314", "retry_count": 4},
            {"artist": "Oasis", "title": "Wonderwall", "external_id": "1", "retry_count": 1}
        ], "summary": ""}"#,
    )
    .unwrap();
    std::fs::write(
        root.path().join("dead_letter.json"),
        r#"{"entries": [{"artist": "Pearl Jam", "title": "Black", "external_id": "314",
            "final_retry_count": 5, "last_attempt_date": "2026-10-01"}], "summary": ""}"#,
    )
    .unwrap();
    let queue = test_queue(root.path());

    let outcome = queue.enqueue_failure(&candidate(), "rejected").await.unwrap();

    assert_eq!(outcome, EnqueueOutcome::AlreadyDeadLettered);
    let pending = queue.drain().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].key(), SongKey::new("Oasis", "Wonderwall", "1"));
    assert_eq!(queue.dead_letters().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_interrupted_promotion_is_repaired_by_next_failure() {
    let root = TempDir::new().unwrap();
    let queue_store = Arc::new(FailingDocumentStore::<QueueDocument>::new(
        root.path().join("retry_queue.json"),
    ));
    queue_store.set_failing(false);
    let queue = RetryQueue::new(
        queue_store.clone(),
        Arc::new(JsonFileStore::<ArchiveDocument>::new(root.path().join("dead_letter.json"))),
    );

    for _ in 1..RETRY_THRESHOLD {
        queue.enqueue_failure(&candidate(), "rejected").await.unwrap();
    }

    // Archive is written, queue write fails: key is now in both documents
    queue_store.set_failing(true);
    let result = queue.enqueue_failure(&candidate(), "rejected").await;
    assert!(matches!(result, Err(IngestError::Document(_))));
    assert_eq!(queue.size().await.unwrap(), 1);
    assert_eq!(queue.dead_letters().await.unwrap().len(), 1);

    queue_store.set_failing(false);
    let outcome = queue.enqueue_failure(&candidate(), "rejected").await.unwrap();

    assert_eq!(outcome, EnqueueOutcome::AlreadyDeadLettered);
    assert_eq!(queue.size().await.unwrap(), 0);
    assert_eq!(queue.dead_letters().await.unwrap().len(), 1);
}
