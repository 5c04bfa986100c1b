//! DRAINING and FINAL_DRAIN: reprocess the retry queue
//!
//! Both states run the same pass. Entries are read in persisted order and fed
//! through deduplicate → insert. Inserted or duplicate entries leave the queue;
//! renewed failures go back through `enqueue_failure`, so retry counts keep
//! accumulating and may reach the dead-letter threshold here.

use super::statistics::RunStatistics;
use super::{pace, IngestionOrchestrator, InsertOutcome};
use crate::models::BatchRun;

impl IngestionOrchestrator {
    pub(super) async fn phase_draining(&self, run: &BatchRun, stats: &mut RunStatistics) {
        let entries = match self.queue.drain().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(run_id = %run.run_id, error = %e, "Could not read retry queue");
                stats.queue_failures += 1;
                return;
            }
        };

        tracing::info!(
            run_id = %run.run_id,
            state = %run.state,
            entries = entries.len(),
            "Draining retry queue"
        );

        for (index, entry) in entries.iter().enumerate() {
            pace(index, self.settings.candidate_delay).await;

            let candidate = entry.to_candidate();
            stats.drained += 1;

            match self.try_insert(&candidate).await {
                InsertOutcome::Inserted => {
                    stats.inserted += 1;
                    stats.reinserted += 1;
                    self.remove_pending(&entry.key(), stats).await;
                }
                InsertOutcome::Duplicate => {
                    // Stored by an earlier run or the scan; nothing left to retry
                    stats.skipped += 1;
                    self.remove_pending(&entry.key(), stats).await;
                }
                InsertOutcome::Failed(error) => {
                    self.record_failure(&candidate, error, stats).await;
                }
            }
        }
    }
}
