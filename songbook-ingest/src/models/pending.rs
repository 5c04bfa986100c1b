//! Retry queue and dead-letter archive entries
//!
//! Both documents are stored whole: an `entries` list followed by a one-line
//! `summary`. The summary is informational and is regenerated on every save.

use crate::models::{SongCandidate, SongKey};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A song whose insert failed and will be retried on a later drain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub artist: String,
    pub title: String,
    pub external_id: String,
    pub retry_count: u32,
    /// Message of the most recent failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Snapshot of the failed candidate so reinsertion keeps its attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<SongCandidate>,
}

impl PendingEntry {
    /// First failure of a key
    pub fn first_failure(candidate: &SongCandidate, error: &str) -> Self {
        Self {
            artist: candidate.artist.clone(),
            title: candidate.title.clone(),
            external_id: candidate.external_id.clone(),
            retry_count: 1,
            last_error: Some(error.to_string()),
            candidate: Some(candidate.clone()),
        }
    }

    pub fn key(&self) -> SongKey {
        SongKey::new(&self.artist, &self.title, &self.external_id)
    }

    pub fn matches(&self, key: &SongKey) -> bool {
        self.artist == key.artist && self.title == key.title && self.external_id == key.external_id
    }

    /// Candidate to feed back through the insert path
    ///
    /// Entries written without a snapshot are rebuilt from the key with
    /// default attributes.
    pub fn to_candidate(&self) -> SongCandidate {
        match &self.candidate {
            Some(candidate) => candidate.clone(),
            None => SongCandidate::new(&self.title, &self.artist, &self.external_id),
        }
    }
}

/// A song that exhausted its retries and awaits manual review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub artist: String,
    pub title: String,
    pub external_id: String,
    pub final_retry_count: u32,
    pub last_attempt_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DeadLetterEntry {
    /// Promote a pending entry that reached the retry threshold
    pub fn promote(entry: PendingEntry, last_attempt_date: NaiveDate) -> Self {
        Self {
            artist: entry.artist,
            title: entry.title,
            external_id: entry.external_id,
            final_retry_count: entry.retry_count,
            last_attempt_date,
            last_error: entry.last_error,
        }
    }

    pub fn key(&self) -> SongKey {
        SongKey::new(&self.artist, &self.title, &self.external_id)
    }

    pub fn matches(&self, key: &SongKey) -> bool {
        self.artist == key.artist && self.title == key.title && self.external_id == key.external_id
    }
}

/// Persisted retry queue document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueDocument {
    #[serde(default)]
    pub entries: Vec<PendingEntry>,
    #[serde(default)]
    pub summary: String,
}

impl QueueDocument {
    pub fn from_entries(entries: Vec<PendingEntry>) -> Self {
        let summary = format!(
            "{} pending {} (updated {})",
            entries.len(),
            plural(entries.len()),
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
        Self { entries, summary }
    }
}

/// Persisted dead-letter archive document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    #[serde(default)]
    pub entries: Vec<DeadLetterEntry>,
    #[serde(default)]
    pub summary: String,
}

impl ArchiveDocument {
    pub fn from_entries(entries: Vec<DeadLetterEntry>) -> Self {
        let summary = format!(
            "{} dead-lettered {} (updated {})",
            entries.len(),
            plural(entries.len()),
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
        Self { entries, summary }
    }

    pub fn contains(&self, key: &SongKey) -> bool {
        self.entries.iter().any(|e| e.matches(key))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "entry"
    } else {
        "entries"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_is_last_field_in_json() {
        let candidate = SongCandidate::new("Creep", "Radiohead", "77");
        let doc = QueueDocument::from_entries(vec![PendingEntry::first_failure(&candidate, "boom")]);

        let json = serde_json::to_string_pretty(&doc).unwrap();
        let summary_pos = json.find("\"summary\"").unwrap();
        let entries_pos = json.find("\"entries\"").unwrap();

        assert!(entries_pos < summary_pos);
        assert!(doc.summary.starts_with("1 pending entry"));
    }

    #[test]
    fn test_entry_without_snapshot_rebuilds_candidate() {
        let json = r#"{"artist": "Radiohead", "title": "Creep", "external_id": "77", "retry_count": 2}"#;
        let entry: PendingEntry = serde_json::from_str(json).unwrap();

        let candidate = entry.to_candidate();
        assert_eq!(candidate.key(), entry.key());
        assert_eq!(candidate.attributes, Default::default());
    }

    #[test]
    fn test_promote_carries_retry_count() {
        let candidate = SongCandidate::new("Creep", "Radiohead", "77");
        let mut entry = PendingEntry::first_failure(&candidate, "boom");
        entry.retry_count = 5;

        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let dead = DeadLetterEntry::promote(entry, date);

        assert_eq!(dead.final_retry_count, 5);
        assert_eq!(dead.last_attempt_date, date);
        assert_eq!(dead.last_error.as_deref(), Some("boom"));
    }
}
