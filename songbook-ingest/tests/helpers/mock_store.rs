//! In-memory record store with scripted failures

use async_trait::async_trait;
use songbook_ingest::models::{SongCandidate, SongKey, StoredSong};
use songbook_ingest::services::RecordStore;
use songbook_ingest::{IngestError, IngestResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub struct MockRecordStore {
    songs: Mutex<Vec<StoredSong>>,
    rejected_ids: Mutex<HashSet<String>>,
    reachable: AtomicBool,
    insert_log: Mutex<Vec<SongKey>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            songs: Mutex::new(Vec::new()),
            rejected_ids: Mutex::new(HashSet::new()),
            reachable: AtomicBool::new(true),
            insert_log: Mutex::new(Vec::new()),
        }
    }

    /// Store whose connectivity probe fails
    pub fn unreachable() -> Self {
        let store = Self::new();
        store.reachable.store(false, Ordering::SeqCst);
        store
    }

    /// Reject every insert of this external id
    pub fn reject(&self, external_id: &str) {
        self.rejected_ids.lock().unwrap().insert(external_id.to_string());
    }

    pub fn accept(&self, external_id: &str) {
        self.rejected_ids.lock().unwrap().remove(external_id);
    }

    /// Pre-existing record
    pub fn seed(&self, title: &str, artist: &str, external_id: &str) {
        self.songs.lock().unwrap().push(StoredSong {
            guid: Uuid::new_v4(),
            title: title.to_string(),
            artist: artist.to_string(),
            external_id: external_id.to_string(),
            source_url: None,
        });
    }

    pub fn stored(&self) -> Vec<StoredSong> {
        self.songs.lock().unwrap().clone()
    }

    /// Every insert attempt in call order, accepted or not
    pub fn insert_log(&self) -> Vec<SongKey> {
        self.insert_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn ping(&self) -> IngestResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(IngestError::Connectivity("connection refused".into()))
        }
    }

    async fn exists(&self, title: &str, artist: &str) -> IngestResult<Vec<StoredSong>> {
        Ok(self
            .songs
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.title == title && s.artist == artist)
            .cloned()
            .collect())
    }

    async fn insert(&self, candidate: &SongCandidate) -> IngestResult<()> {
        self.insert_log.lock().unwrap().push(candidate.key());

        if self.rejected_ids.lock().unwrap().contains(&candidate.external_id) {
            return Err(IngestError::Store(format!(
                "insert rejected for {}",
                candidate.external_id
            )));
        }

        self.songs.lock().unwrap().push(StoredSong {
            guid: Uuid::new_v4(),
            title: candidate.title.clone(),
            artist: candidate.artist.clone(),
            external_id: candidate.external_id.clone(),
            source_url: candidate.source_url.clone(),
        });
        Ok(())
    }
}
