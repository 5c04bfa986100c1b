//! Test Helper Utilities
//!
//! Shared utilities for testing songbook-ingest

#![allow(dead_code)]

pub mod documents;
pub mod failing_documents;
pub mod mock_store;

pub use documents::{song_page, write_document, Song};
pub use failing_documents::FailingDocumentStore;
pub use mock_store::MockRecordStore;

use songbook_ingest::services::{IngestionOrchestrator, OrchestratorSettings, RetryQueue};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source document directory inside a scratch root
pub fn source_dir(root: &Path) -> PathBuf {
    root.join("sources")
}

/// Retry queue documents inside a scratch root
pub fn test_queue(root: &Path) -> RetryQueue {
    RetryQueue::from_paths(root.join("retry_queue.json"), root.join("dead_letter.json"))
}

/// Orchestrator over `store` with no pacing delays
pub fn test_orchestrator(store: Arc<MockRecordStore>, root: &Path) -> IngestionOrchestrator {
    orchestrator_with_queue(store, test_queue(root), root)
}

pub fn orchestrator_with_queue(
    store: Arc<MockRecordStore>,
    queue: RetryQueue,
    root: &Path,
) -> IngestionOrchestrator {
    IngestionOrchestrator::new(
        store,
        queue,
        OrchestratorSettings::new(source_dir(root)).without_delays(),
    )
}
