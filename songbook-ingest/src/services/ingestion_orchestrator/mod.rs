//! Batch ingestion orchestrator
//!
//! # State Progression
//! INIT → (DRAINING) → SCANNING → FINAL_DRAIN → REPORT
//!
//! Each state is handled by a `phase_*` method in its own module:
//!
//! - **INIT** (`phase_init`): probe the record store, decide whether the
//!   retry queue is backed up enough to drain before scanning
//! - **DRAINING** / **FINAL_DRAIN** (`phase_draining`): feed queued entries
//!   back through the insert path
//! - **SCANNING** (`phase_scanning`): extract, deduplicate and insert from
//!   every source document in path order
//!
//! Only a failed connectivity probe at INIT aborts a run. Every later failure
//! is logged, tallied and, for inserts, recorded in the retry queue.
//!
//! The run is strictly sequential: at most one store mutation, queue write or
//! document read is in flight at a time. The queue documents are rewritten
//! whole with no locking and rely on that.

use crate::error::{IngestError, IngestResult};
use crate::models::{BatchRun, BatchState, SongCandidate, SongKey};
use crate::services::document_scanner::DocumentScanner;
use crate::services::record_store::RecordStore;
use crate::services::retry_queue::{EnqueueOutcome, RetryQueue};
use crate::services::song_deduplicator::SongDeduplicator;
use crate::services::song_extractor::SongExtractor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod phase_draining;
mod phase_init;
mod phase_scanning;
pub mod statistics;

pub use statistics::{RunStatistics, RunSummary};

/// Queue size at INIT that forces a drain before scanning
pub const REPROCESS_THRESHOLD: usize = 10;

/// Default pause between candidates (and between drained entries)
pub const DEFAULT_CANDIDATE_DELAY: Duration = Duration::from_millis(100);

/// Default pause between source documents
pub const DEFAULT_DOCUMENT_DELAY: Duration = Duration::from_millis(500);

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Directory of source documents scanned on every run
    pub source_dir: PathBuf,
    pub reprocess_threshold: usize,
    pub candidate_delay: Duration,
    pub document_delay: Duration,
}

impl OrchestratorSettings {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            reprocess_threshold: REPROCESS_THRESHOLD,
            candidate_delay: DEFAULT_CANDIDATE_DELAY,
            document_delay: DEFAULT_DOCUMENT_DELAY,
        }
    }

    /// Zero delays, for tests and local replays
    pub fn without_delays(mut self) -> Self {
        self.candidate_delay = Duration::ZERO;
        self.document_delay = Duration::ZERO;
        self
    }
}

/// Result of one pass through the insert path
#[derive(Debug)]
enum InsertOutcome {
    Inserted,
    Duplicate,
    Failed(IngestError),
}

/// Ingestion orchestrator service
pub struct IngestionOrchestrator {
    store: Arc<dyn RecordStore>,
    queue: RetryQueue,
    extractor: SongExtractor,
    deduplicator: SongDeduplicator,
    scanner: DocumentScanner,
    settings: OrchestratorSettings,
}

impl IngestionOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>, queue: RetryQueue, settings: OrchestratorSettings) -> Self {
        Self {
            deduplicator: SongDeduplicator::new(Arc::clone(&store)),
            store,
            queue,
            extractor: SongExtractor::new(),
            scanner: DocumentScanner::new(),
            settings,
        }
    }

    pub fn with_extractor(mut self, extractor: SongExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_scanner(mut self, scanner: DocumentScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// Execute one complete batch run
    ///
    /// Returns `IngestError::Connectivity` when the record store is
    /// unreachable at INIT; otherwise always reaches REPORT.
    pub async fn run_batch(&self) -> IngestResult<RunSummary> {
        let mut run = BatchRun::new();
        let mut stats = RunStatistics::default();

        tracing::info!(
            run_id = %run.run_id,
            source_dir = %self.settings.source_dir.display(),
            "Starting batch run"
        );

        let drain_first = match self.phase_init(&run, &mut stats).await {
            Ok(drain_first) => drain_first,
            Err(e) => {
                tracing::error!(run_id = %run.run_id, error = %e, "Batch run aborted at INIT");
                return Err(e);
            }
        };

        if drain_first {
            run.transition_to(BatchState::Draining);
            self.phase_draining(&run, &mut stats).await;
        }

        run.transition_to(BatchState::Scanning);
        self.phase_scanning(&run, &mut stats).await;

        run.transition_to(BatchState::FinalDrain);
        self.phase_draining(&run, &mut stats).await;

        let pending_after = match self.queue.size().await {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read retry queue size for report");
                stats.queue_failures += 1;
                0
            }
        };

        run.transition_to(BatchState::Report);

        tracing::info!(
            run_id = %run.run_id,
            documents_processed = stats.documents_processed,
            candidates_extracted = stats.candidates_extracted,
            inserted = stats.inserted,
            skipped = stats.skipped,
            errors = stats.errors,
            dead_lettered = stats.dead_lettered.len(),
            pending_after,
            duration_ms = run.duration_ms(),
            "Batch run complete"
        );

        Ok(RunSummary {
            run,
            statistics: stats,
            pending_after,
        })
    }

    /// Deduplicate, then insert when the candidate is not already stored
    async fn try_insert(&self, candidate: &SongCandidate) -> InsertOutcome {
        let decision = match self.deduplicator.check(candidate).await {
            Ok(decision) => decision,
            Err(e) => return InsertOutcome::Failed(e),
        };

        if !decision.should_insert() {
            return InsertOutcome::Duplicate;
        }

        match self.store.insert(candidate).await {
            Ok(()) => InsertOutcome::Inserted,
            Err(e) => InsertOutcome::Failed(e),
        }
    }

    /// Tally a failed insert and record it in the retry queue
    async fn record_failure(
        &self,
        candidate: &SongCandidate,
        error: IngestError,
        stats: &mut RunStatistics,
    ) {
        stats.errors += 1;
        tracing::warn!(key = %candidate.key(), error = %error, "Insert failed");

        match self.queue.enqueue_failure(candidate, &error.to_string()).await {
            Ok(EnqueueOutcome::DeadLettered(entry)) => stats.dead_lettered.push(entry.key()),
            Ok(EnqueueOutcome::Queued { .. }) | Ok(EnqueueOutcome::AlreadyDeadLettered) => {}
            Err(e) => {
                stats.queue_failures += 1;
                tracing::error!(
                    key = %candidate.key(),
                    error = %e,
                    "Failed to record insert failure in retry queue"
                );
            }
        }
    }

    /// Drop a key from the retry queue once it is stored; absent keys are fine
    async fn remove_pending(&self, key: &SongKey, stats: &mut RunStatistics) {
        if let Err(e) = self.queue.remove(key).await {
            stats.queue_failures += 1;
            tracing::error!(key = %key, error = %e, "Failed to remove entry from retry queue");
        }
    }
}

/// Pause between consecutive items; never before the first one
async fn pace(index: usize, delay: Duration) {
    if index > 0 && !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
