//! Song deduplication against the record store
//!
//! Decision rule:
//! - identical (title, artist, external_id) already stored → Duplicate (skip)
//! - same (title, artist) stored only under other external ids → Variation (insert)
//! - nothing stored for (title, artist) → New (insert)
//!
//! Variations are accepted on purpose: one song commonly has several
//! arrangements, each with its own external id.

use crate::error::IngestResult;
use crate::models::{SongCandidate, StoredSong};
use crate::services::record_store::RecordStore;
use std::sync::Arc;

/// Deduplication result
#[derive(Debug, Clone, PartialEq)]
pub enum DedupDecision {
    /// No record for this title and artist
    New,
    /// Records exist for this title and artist, none with this external id
    Variation { existing: usize },
    /// Identical record already stored
    Duplicate(StoredSong),
}

impl DedupDecision {
    /// Whether the candidate should be inserted
    pub fn should_insert(&self) -> bool {
        !matches!(self, DedupDecision::Duplicate(_))
    }
}

/// Read-only deduplicator
pub struct SongDeduplicator {
    store: Arc<dyn RecordStore>,
}

impl SongDeduplicator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Decide whether `candidate` is already stored
    pub async fn check(&self, candidate: &SongCandidate) -> IngestResult<DedupDecision> {
        let existing = self.store.exists(&candidate.title, &candidate.artist).await?;

        if let Some(same) = existing.iter().find(|song| song.is_same_song(candidate)) {
            tracing::debug!(
                key = %candidate.key(),
                stored_guid = %same.guid,
                "Duplicate song, skipping"
            );
            return Ok(DedupDecision::Duplicate(same.clone()));
        }

        if existing.is_empty() {
            Ok(DedupDecision::New)
        } else {
            tracing::debug!(
                key = %candidate.key(),
                existing = existing.len(),
                "New variation of a stored song"
            );
            Ok(DedupDecision::Variation {
                existing: existing.len(),
            })
        }
    }
}
