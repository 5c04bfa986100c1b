//! songbook-ingest library interface
//!
//! Batch ingestion of song records from source documents into the song
//! database, with a durable retry queue and dead-letter archive, plus an
//! invoker for the external fetch/search tool.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use crate::error::{IngestError, IngestResult};
