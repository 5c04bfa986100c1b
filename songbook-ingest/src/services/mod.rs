//! Service modules for song ingestion
//!
//! Leaf-first: the extractor, deduplicator, retry queue and document scanner
//! are composed by the ingestion orchestrator. The tool invoker is a separate
//! entry point for single-item fetch and search.

pub mod document_scanner;
pub mod document_store;
pub mod ingestion_orchestrator;
pub mod record_store;
pub mod retry_queue;
pub mod song_deduplicator;
pub mod song_extractor;
pub mod tool_invoker;

pub use document_scanner::{DocumentScanner, ScanError};
pub use document_store::{DocumentStore, JsonFileStore};
pub use ingestion_orchestrator::{
    IngestionOrchestrator, OrchestratorSettings, RunStatistics, RunSummary, REPROCESS_THRESHOLD,
};
pub use record_store::RecordStore;
pub use retry_queue::{EnqueueOutcome, RetryQueue, RETRY_THRESHOLD};
pub use song_deduplicator::{DedupDecision, SongDeduplicator};
pub use song_extractor::{ExtractError, SongExtractor};
pub use tool_invoker::{
    ExportedSong, OperationKind, SearchHit, ToolError, ToolInvoker, ToolOperation, ToolOutput,
};
