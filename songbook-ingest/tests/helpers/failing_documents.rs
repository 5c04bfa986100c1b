//! Document store whose writes can be switched off

use async_trait::async_trait;
use songbook_ingest::services::{DocumentStore, JsonFileStore};
use songbook_ingest::{IngestError, IngestResult};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// JSON file store that rejects `save` while failing is enabled
///
/// Loads always go to the file, so documents written before the failure
/// started stay visible.
pub struct FailingDocumentStore<D> {
    inner: JsonFileStore<D>,
    failing: AtomicBool,
    rejected_saves: AtomicUsize,
}

impl<D> FailingDocumentStore<D> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: JsonFileStore::new(path),
            failing: AtomicBool::new(true),
            rejected_saves: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rejected_saves(&self) -> usize {
        self.rejected_saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<D> DocumentStore<D> for FailingDocumentStore<D>
where
    D: serde::Serialize + serde::de::DeserializeOwned + Default + Send + Sync + 'static,
{
    async fn load(&self) -> IngestResult<D> {
        self.inner.load().await
    }

    async fn save(&self, document: &D) -> IngestResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            self.rejected_saves.fetch_add(1, Ordering::SeqCst);
            return Err(IngestError::Document(format!(
                "{} is read-only",
                self.inner.path().display()
            )));
        }
        self.inner.save(document).await
    }
}
