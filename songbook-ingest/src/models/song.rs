//! Song records flowing through the ingestion pipeline
//!
//! A `SongCandidate` is produced by the extractor, checked by the
//! deduplicator and handed to the record store once. It is never persisted by
//! the pipeline itself except as a snapshot inside a pending retry entry.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Genre used when the source item carries none
pub const DEFAULT_GENRE: &str = "Unknown";

/// Standard guitar tuning, used when the source item carries none
pub const DEFAULT_TUNING: &str = "E A D G B E";

/// Instrument type used when the source item carries none
pub const DEFAULT_INSTRUMENT_TYPE: &str = "Guitar";

/// Optional descriptive fields of a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongAttributes {
    pub genre: String,
    pub tuning: String,
    pub instrument_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl Default for SongAttributes {
    fn default() -> Self {
        Self {
            genre: DEFAULT_GENRE.to_string(),
            tuning: DEFAULT_TUNING.to_string(),
            instrument_type: DEFAULT_INSTRUMENT_TYPE.to_string(),
            difficulty: None,
            rating: None,
            votes: None,
            version: None,
        }
    }
}

/// Extracted, not-yet-persisted song record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongCandidate {
    pub title: String,
    pub artist: String,
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub attributes: SongAttributes,
}

impl SongCandidate {
    /// Candidate with default attributes
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            external_id: external_id.into(),
            source_url: None,
            attributes: SongAttributes::default(),
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn key(&self) -> SongKey {
        SongKey {
            artist: self.artist.clone(),
            title: self.title.clone(),
            external_id: self.external_id.clone(),
        }
    }
}

/// Identity of a song across the retry queue and dead-letter archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongKey {
    pub artist: String,
    pub title: String,
    pub external_id: String,
}

impl SongKey {
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} [{}]", self.artist, self.title, self.external_id)
    }
}

/// Song record as held by the record store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSong {
    pub guid: Uuid,
    pub title: String,
    pub artist: String,
    pub external_id: String,
    pub source_url: Option<String>,
}

impl StoredSong {
    /// True when this record has the identical (title, artist, external_id) triple
    pub fn is_same_song(&self, candidate: &SongCandidate) -> bool {
        self.title == candidate.title
            && self.artist == candidate.artist
            && self.external_id == candidate.external_id
    }
}

/// Accept external ids encoded either as JSON numbers or strings
pub(crate) fn deserialize_external_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
