//! Error types for songbook-ingest
//!
//! Severity split used by the batch run:
//! - `Connectivity` is fatal and aborts the run before any processing
//! - everything else is caught per document or per candidate, logged and tallied
//!
//! Duplicates are not errors; the deduplicator reports them as a skip decision.

use crate::services::song_extractor::ExtractError;
use crate::services::tool_invoker::ToolError;
use thiserror::Error;

/// Ingestion error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// Source document had no usable embedded payload
    #[error("Parse error: {0}")]
    Parse(#[from] ExtractError),

    /// Record store rejected an insert or lookup
    #[error("Store error: {0}")]
    Store(String),

    /// Record store unreachable at batch start
    #[error("Record store unreachable: {0}")]
    Connectivity(String),

    /// External tool invocation failed (timeout, nonzero exit, spawn failure)
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Retry queue or dead-letter document could not be read or written
    #[error("Queue document error: {0}")]
    Document(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// songbook-common error
    #[error("Common error: {0}")]
    Common(#[from] songbook_common::Error),
}

impl IngestError {
    /// Only an unreachable record store aborts a batch run
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Connectivity(_))
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::Store(err.to_string())
    }
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;
