//! Durable retry queue with dead-letter escalation
//!
//! Failed inserts are recorded per song key with a retry count. A key that
//! fails `threshold` times is moved out of the queue into the dead-letter
//! archive for manual review.
//!
//! A key lives in at most one of the two documents. Once dead-lettered, later
//! failures of the same key leave it in the archive and do not re-queue it.

use crate::error::IngestResult;
use crate::models::{
    ArchiveDocument, DeadLetterEntry, PendingEntry, QueueDocument, SongCandidate, SongKey,
};
use crate::services::document_store::{DocumentStore, JsonFileStore};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

/// Failures allowed per key before it is dead-lettered
pub const RETRY_THRESHOLD: u32 = 5;

/// What `enqueue_failure` did with the key
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// Key is pending with this retry count
    Queued { retry_count: u32 },
    /// Key reached the threshold and was moved to the archive
    DeadLettered(DeadLetterEntry),
    /// Key was already in the archive; only a stale queue entry is removed
    AlreadyDeadLettered,
}

/// Retry queue backed by two whole-document stores
pub struct RetryQueue {
    queue: Arc<dyn DocumentStore<QueueDocument>>,
    archive: Arc<dyn DocumentStore<ArchiveDocument>>,
    threshold: u32,
}

impl RetryQueue {
    pub fn new(
        queue: Arc<dyn DocumentStore<QueueDocument>>,
        archive: Arc<dyn DocumentStore<ArchiveDocument>>,
    ) -> Self {
        Self {
            queue,
            archive,
            threshold: RETRY_THRESHOLD,
        }
    }

    /// JSON documents at the given paths
    pub fn from_paths(queue_path: impl Into<PathBuf>, archive_path: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(JsonFileStore::<QueueDocument>::new(queue_path)),
            Arc::new(JsonFileStore::<ArchiveDocument>::new(archive_path)),
        )
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Record one failed insert of `candidate`
    ///
    /// **Algorithm:**
    /// 1. Key already archived → leave it there, drop any stale queue entry
    /// 2. Key pending → retry_count += 1, else insert with retry_count = 1
    /// 3. retry_count >= threshold → remove from queue, append to archive
    /// 4. Persist the changed document(s)
    ///
    /// On promotion the archive is written before the queue.
    pub async fn enqueue_failure(
        &self,
        candidate: &SongCandidate,
        context: &str,
    ) -> IngestResult<EnqueueOutcome> {
        let key = candidate.key();

        let archive = self.archive.load().await?;
        if archive.contains(&key) {
            // A promotion interrupted between the two saves leaves the key in both
            let mut entries = self.queue.load().await?.entries;
            let before = entries.len();
            entries.retain(|e| !e.matches(&key));
            if entries.len() != before {
                self.queue.save(&QueueDocument::from_entries(entries)).await?;
                tracing::info!(key = %key, "Dropped stale retry entry for dead-lettered song");
            }

            tracing::warn!(key = %key, "Failure for already dead-lettered song, not re-queued");
            return Ok(EnqueueOutcome::AlreadyDeadLettered);
        }

        let mut entries = self.queue.load().await?.entries;

        let position = match entries.iter().position(|e| e.matches(&key)) {
            Some(idx) => {
                let entry = &mut entries[idx];
                entry.retry_count += 1;
                entry.last_error = Some(context.to_string());
                entry.candidate = Some(candidate.clone());
                idx
            }
            None => {
                entries.push(PendingEntry::first_failure(candidate, context));
                entries.len() - 1
            }
        };

        let retry_count = entries[position].retry_count;

        if retry_count >= self.threshold {
            let entry = entries.remove(position);
            let dead = DeadLetterEntry::promote(entry, Utc::now().date_naive());

            let mut archived = archive.entries;
            archived.push(dead.clone());
            self.archive
                .save(&ArchiveDocument::from_entries(archived))
                .await?;
            self.queue.save(&QueueDocument::from_entries(entries)).await?;

            tracing::warn!(
                key = %key,
                final_retry_count = dead.final_retry_count,
                "Song dead-lettered after repeated failures"
            );
            return Ok(EnqueueOutcome::DeadLettered(dead));
        }

        self.queue.save(&QueueDocument::from_entries(entries)).await?;

        tracing::debug!(key = %key, retry_count, "Song queued for retry");
        Ok(EnqueueOutcome::Queued { retry_count })
    }

    /// Current pending entries in persisted order (does not modify the queue)
    pub async fn drain(&self) -> IngestResult<Vec<PendingEntry>> {
        Ok(self.queue.load().await?.entries)
    }

    /// Remove a key after successful reinsertion; false when it was not pending
    pub async fn remove(&self, key: &SongKey) -> IngestResult<bool> {
        let mut entries = self.queue.load().await?.entries;
        let before = entries.len();
        entries.retain(|e| !e.matches(key));

        if entries.len() == before {
            return Ok(false);
        }

        self.queue.save(&QueueDocument::from_entries(entries)).await?;
        tracing::debug!(key = %key, "Removed song from retry queue");
        Ok(true)
    }

    /// Number of pending entries
    pub async fn size(&self) -> IngestResult<usize> {
        Ok(self.queue.load().await?.entries.len())
    }

    /// Archived entries in persisted order
    pub async fn dead_letters(&self) -> IngestResult<Vec<DeadLetterEntry>> {
        Ok(self.archive.load().await?.entries)
    }
}
