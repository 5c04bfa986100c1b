//! Song extraction from raw source documents
//!
//! Source pages embed their data as HTML-escaped JSON in the `data-content`
//! attribute of a single `div.js-store` element. Extraction:
//! 1. Locate the container element
//! 2. Decode the attribute (the HTML parser resolves character references)
//! 3. Parse the payload as JSON
//! 4. Descend `store.page.data.results` to the list of raw items
//! 5. Map each item to a `SongCandidate`, defaulting missing attributes
//!
//! Items without a title, artist or id are skipped. The extractor is a pure
//! function of its input.

use crate::models::song::{DEFAULT_GENRE, DEFAULT_INSTRUMENT_TYPE, DEFAULT_TUNING};
use crate::models::{SongAttributes, SongCandidate};
use scraper::{Html, Selector};
use serde_json::Value;
use thiserror::Error;

/// CSS selector of the embedded data container
pub const CONTAINER_SELECTOR: &str = "div.js-store";

/// Attribute holding the escaped JSON payload
pub const PAYLOAD_ATTRIBUTE: &str = "data-content";

/// Path from the payload root to the item list
pub const RESULTS_PATH: [&str; 4] = ["store", "page", "data", "results"];

/// Extraction errors; all of them mean "this document yields no candidates"
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No embedded data container in the document
    #[error("Embedded data container not found")]
    ContainerMissing,

    /// Container present but without a payload attribute
    #[error("Data container has no '{0}' attribute")]
    PayloadMissing(&'static str),

    /// Payload is not valid JSON
    #[error("Embedded payload is not valid JSON: {0}")]
    InvalidPayload(String),

    /// Payload parsed but the item list is not where expected
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),

    /// Container selector could not be built
    #[error("Invalid container selector: {0}")]
    Selector(String),
}

/// Stateless song extractor
#[derive(Debug, Clone)]
pub struct SongExtractor {
    results_path: Vec<String>,
}

impl SongExtractor {
    pub fn new() -> Self {
        Self {
            results_path: RESULTS_PATH.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Use a different path to the item list
    pub fn with_results_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.results_path = path.into_iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Extract candidates from one raw document, in item order
    pub fn extract(&self, raw_document: &str) -> Result<Vec<SongCandidate>, ExtractError> {
        let payload = embedded_payload(raw_document)?;

        let tree: Value = serde_json::from_str(&payload)
            .map_err(|e| ExtractError::InvalidPayload(e.to_string()))?;

        let items = self.descend(&tree)?;

        let mut candidates = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match map_item(item) {
                Some(candidate) => candidates.push(candidate),
                None => {
                    tracing::debug!(index, "Skipping item without title, artist or id");
                }
            }
        }

        Ok(candidates)
    }

    fn descend<'a>(&self, tree: &'a Value) -> Result<&'a Vec<Value>, ExtractError> {
        let mut node = tree;
        for segment in &self.results_path {
            node = node.get(segment.as_str()).ok_or_else(|| {
                ExtractError::UnexpectedShape(format!(
                    "missing '{}' on path {}",
                    segment,
                    self.results_path.join(".")
                ))
            })?;
        }

        node.as_array().ok_or_else(|| {
            ExtractError::UnexpectedShape(format!("{} is not a list", self.results_path.join(".")))
        })
    }
}

impl Default for SongExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded payload of the single data container
fn embedded_payload(raw_document: &str) -> Result<String, ExtractError> {
    let selector = Selector::parse(CONTAINER_SELECTOR)
        .map_err(|e| ExtractError::Selector(format!("{:?}", e)))?;

    let document = Html::parse_document(raw_document);
    let container = document
        .select(&selector)
        .next()
        .ok_or(ExtractError::ContainerMissing)?;

    container
        .value()
        .attr(PAYLOAD_ATTRIBUTE)
        .map(|payload| payload.to_string())
        .ok_or(ExtractError::PayloadMissing(PAYLOAD_ATTRIBUTE))
}

fn map_item(item: &Value) -> Option<SongCandidate> {
    let title = text_field(item, &["song_name", "title"])?;
    let artist = text_field(item, &["artist_name", "artist"])?;
    let external_id = text_field(item, &["id", "tab_id"])?;

    let attributes = SongAttributes {
        genre: text_field(item, &["genre", "genre_name"])
            .unwrap_or_else(|| DEFAULT_GENRE.to_string()),
        tuning: tuning_field(item).unwrap_or_else(|| DEFAULT_TUNING.to_string()),
        instrument_type: text_field(item, &["instrument_type", "type"])
            .unwrap_or_else(|| DEFAULT_INSTRUMENT_TYPE.to_string()),
        difficulty: text_field(item, &["difficulty"]),
        rating: item.get("rating").and_then(Value::as_f64),
        votes: item.get("votes").and_then(Value::as_u64),
        version: item
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok()),
    };

    Some(SongCandidate {
        title,
        artist,
        external_id,
        source_url: text_field(item, &["tab_url", "url"]),
        attributes,
    })
}

/// First non-empty string (or number) among `names`
fn text_field(item: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match item.get(*name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Tuning is either a plain string or `{ "value": "...", "name": "..." }`
fn tuning_field(item: &Value) -> Option<String> {
    match item.get("tuning")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => obj
            .get("value")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(payload: &str) -> String {
        let escaped = payload
            .replace('&', "&amp;")
            .replace('"', "&quot;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!(
            "<html><body><div class=\"js-store\" data-content=\"{}\"></div></body></html>",
            escaped
        )
    }

    #[test]
    fn test_extracts_items_in_order() {
        let doc = page(
            r#"{"store":{"page":{"data":{"results":[
                {"id": 1, "song_name": "Wonderwall", "artist_name": "Oasis", "tab_url": "https://x/1"},
                {"id": "2", "song_name": "Creep", "artist_name": "Radiohead", "type": "Ukulele",
                 "tuning": {"name": "Drop D", "value": "D A D G B E"}, "genre": "Rock", "rating": 4.5, "votes": 12}
            ]}}}}"#,
        );

        let candidates = SongExtractor::new().extract(&doc).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Wonderwall");
        assert_eq!(candidates[0].external_id, "1");
        assert_eq!(candidates[0].source_url.as_deref(), Some("https://x/1"));
        assert_eq!(candidates[0].attributes, SongAttributes::default());

        assert_eq!(candidates[1].external_id, "2");
        assert_eq!(candidates[1].attributes.tuning, "D A D G B E");
        assert_eq!(candidates[1].attributes.instrument_type, "Ukulele");
        assert_eq!(candidates[1].attributes.genre, "Rock");
        assert_eq!(candidates[1].attributes.rating, Some(4.5));
        assert_eq!(candidates[1].attributes.votes, Some(12));
    }

    #[test]
    fn test_unescapes_markup_inside_values() {
        let doc = page(
            r#"{"store":{"page":{"data":{"results":[
                {"id": 3, "song_name": "Rock & Roll <Live>", "artist_name": "Led Zeppelin"}
            ]}}}}"#,
        );

        let candidates = SongExtractor::new().extract(&doc).unwrap();
        assert_eq!(candidates[0].title, "Rock & Roll <Live>");
    }

    #[test]
    fn test_skips_incomplete_items() {
        let doc = page(
            r#"{"store":{"page":{"data":{"results":[
                {"id": 1, "song_name": "No Artist"},
                {"song_name": "No Id", "artist_name": "Someone"},
                {"id": 2, "song_name": "Ok", "artist_name": "Band"}
            ]}}}}"#,
        );

        let candidates = SongExtractor::new().extract(&doc).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Ok");
    }

    #[test]
    fn test_empty_results_is_not_an_error() {
        let doc = page(r#"{"store":{"page":{"data":{"results":[]}}}}"#);
        assert!(SongExtractor::new().extract(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_missing_container() {
        let result = SongExtractor::new().extract("<html><body><p>nothing</p></body></html>");
        assert!(matches!(result, Err(ExtractError::ContainerMissing)));
    }

    #[test]
    fn test_container_without_payload() {
        let result = SongExtractor::new().extract("<div class=\"js-store\"></div>");
        assert!(matches!(result, Err(ExtractError::PayloadMissing(_))));
    }

    #[test]
    fn test_invalid_payload() {
        let result = SongExtractor::new().extract(&page("{not json"));
        assert!(matches!(result, Err(ExtractError::InvalidPayload(_))));
    }

    #[test]
    fn test_unexpected_shape() {
        let result = SongExtractor::new().extract(&page(r#"{"store":{"page":{}}}"#));
        assert!(matches!(result, Err(ExtractError::UnexpectedShape(_))));

        let result = SongExtractor::new()
            .extract(&page(r#"{"store":{"page":{"data":{"results":{"id":1}}}}}"#));
        assert!(matches!(result, Err(ExtractError::UnexpectedShape(_))));
    }

    #[test]
    fn test_custom_results_path() {
        let doc = page(r#"{"data":{"songs":[{"id":5,"title":"Song","artist":"Band"}]}}"#);

        let candidates = SongExtractor::new()
            .with_results_path(&["data", "songs"])
            .extract(&doc)
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id, "5");
    }
}
