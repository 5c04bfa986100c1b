//! Whole-document persistence for the retry queue and dead-letter archive
//!
//! Every save rewrites the entire document. There is no append log and no
//! locking: the batch run is the only writer.

use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Load/save access to one persisted document
#[async_trait]
pub trait DocumentStore<D>: Send + Sync
where
    D: Send + Sync,
{
    /// Current document; a missing document is the empty state
    async fn load(&self) -> IngestResult<D>;

    /// Replace the persisted document with `document`
    async fn save(&self, document: &D) -> IngestResult<()>;
}

/// Pretty-printed JSON file store
pub struct JsonFileStore<D> {
    path: PathBuf,
    _document: PhantomData<fn() -> D>,
}

impl<D> JsonFileStore<D> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<D> DocumentStore<D> for JsonFileStore<D>
where
    D: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    async fn load(&self) -> IngestResult<D> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Document absent, using empty state");
                return Ok(D::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(D::default());
        }

        serde_json::from_str(&content).map_err(|e| {
            IngestError::Document(format!("{} is not a valid document: {}", self.path.display(), e))
        })
    }

    async fn save(&self, document: &D) -> IngestResult<()> {
        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            songbook_common::fs_utils::write_atomic(&path, json.as_bytes())
        })
        .await
        .map_err(|e| IngestError::Document(format!("Document write task failed: {}", e)))??;

        tracing::debug!(path = %self.path.display(), "Document saved");
        Ok(())
    }
}
