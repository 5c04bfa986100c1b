//! Record store boundary
//!
//! The pipeline only needs three things from the song database: a
//! connectivity probe at batch start, a lookup by (title, artist) and an
//! insert. Schema and connection lifecycle belong to the implementation.

use crate::error::IngestResult;
use crate::models::{SongCandidate, StoredSong};
use async_trait::async_trait;

/// Song record store consumed by the ingestion pipeline
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Connectivity probe, called once at batch start
    ///
    /// Returns `IngestError::Connectivity` when the store cannot be reached.
    async fn ping(&self) -> IngestResult<()>;

    /// Records with this exact title and artist (empty when none)
    ///
    /// Several records can share a (title, artist) pair when they differ by
    /// external id.
    async fn exists(&self, title: &str, artist: &str) -> IngestResult<Vec<StoredSong>>;

    /// Persist a candidate; `IngestError::Store` on rejection
    async fn insert(&self, candidate: &SongCandidate) -> IngestResult<()>;
}
