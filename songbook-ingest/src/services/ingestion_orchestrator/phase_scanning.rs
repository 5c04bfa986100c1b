//! SCANNING: extract, deduplicate and insert from source documents

use super::statistics::RunStatistics;
use super::{pace, IngestionOrchestrator, InsertOutcome};
use crate::error::IngestError;
use crate::models::BatchRun;
use std::path::Path;

impl IngestionOrchestrator {
    /// Process every source document in path order
    ///
    /// A document that cannot be read or parsed is counted as failed and
    /// skipped. A missing source directory yields zero documents.
    pub(super) async fn phase_scanning(&self, run: &BatchRun, stats: &mut RunStatistics) {
        let documents = match self.scanner.scan(&self.settings.source_dir) {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(run_id = %run.run_id, error = %e, "Source directory not scanned");
                Vec::new()
            }
        };
        stats.documents_found = documents.len();

        tracing::info!(run_id = %run.run_id, documents = documents.len(), "Scanning source documents");

        for (index, path) in documents.iter().enumerate() {
            pace(index, self.settings.document_delay).await;
            self.process_document(path, stats).await;
        }
    }

    async fn process_document(&self, path: &Path, stats: &mut RunStatistics) {
        let raw = match tokio::fs::read(path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                stats.documents_failed += 1;
                tracing::warn!(path = %path.display(), error = %e, "Failed to read document");
                return;
            }
        };

        let candidates = match self.extractor.extract(&raw) {
            Ok(candidates) => candidates,
            Err(e) => {
                stats.documents_failed += 1;
                let error = IngestError::from(e);
                tracing::warn!(path = %path.display(), error = %error, "Document yielded no candidates");
                return;
            }
        };

        stats.documents_processed += 1;
        stats.candidates_extracted += candidates.len();

        tracing::debug!(path = %path.display(), candidates = candidates.len(), "Document extracted");

        for (index, candidate) in candidates.iter().enumerate() {
            pace(index, self.settings.candidate_delay).await;

            match self.try_insert(candidate).await {
                InsertOutcome::Inserted => {
                    stats.inserted += 1;
                    tracing::debug!(key = %candidate.key(), "Song inserted");
                    // A key queued by an earlier run is settled now
                    self.remove_pending(&candidate.key(), stats).await;
                }
                InsertOutcome::Duplicate => stats.skipped += 1,
                InsertOutcome::Failed(error) => {
                    self.record_failure(candidate, error, stats).await;
                }
            }
        }
    }
}
