//! INIT: connectivity probe and drain decision

use super::IngestionOrchestrator;
use super::statistics::RunStatistics;
use crate::error::{IngestError, IngestResult};
use crate::models::BatchRun;

impl IngestionOrchestrator {
    /// Probe the record store, then decide whether to drain before scanning
    ///
    /// Any probe failure is reported as `IngestError::Connectivity`. A queue
    /// that cannot be read counts as empty so the run still scans.
    pub(super) async fn phase_init(
        &self,
        run: &BatchRun,
        stats: &mut RunStatistics,
    ) -> IngestResult<bool> {
        self.store.ping().await.map_err(|e| match e {
            IngestError::Connectivity(_) => e,
            other => IngestError::Connectivity(other.to_string()),
        })?;

        let pending = match self.queue.size().await {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read retry queue at INIT, assuming empty");
                stats.queue_failures += 1;
                0
            }
        };
        stats.pending_at_start = pending;

        let drain_first = pending >= self.settings.reprocess_threshold;

        tracing::info!(
            run_id = %run.run_id,
            pending,
            reprocess_threshold = self.settings.reprocess_threshold,
            drain_first,
            "Record store reachable"
        );

        Ok(drain_first)
    }
}
