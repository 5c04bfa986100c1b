//! Data models for songbook-ingest
//!
//! - Song candidates and their identity key
//! - Retry queue / dead-letter archive entries and documents
//! - Batch run state machine

pub mod batch_run;
pub mod pending;
pub mod song;

pub use batch_run::{BatchRun, BatchState, StateTransition};
pub use pending::{ArchiveDocument, DeadLetterEntry, PendingEntry, QueueDocument};
pub use song::{SongAttributes, SongCandidate, SongKey, StoredSong};
