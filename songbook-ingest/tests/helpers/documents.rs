//! Source document builders

use serde_json::json;
use std::path::{Path, PathBuf};

/// Minimal song item
pub struct Song<'a> {
    pub id: u64,
    pub title: &'a str,
    pub artist: &'a str,
}

/// HTML page embedding `songs` the way source pages do
pub fn song_page(songs: &[Song<'_>]) -> String {
    let results: Vec<_> = songs
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "song_name": s.title,
                "artist_name": s.artist,
                "tab_url": format!("https://songs.example/tab/{}", s.id),
                "type": "Chords",
            })
        })
        .collect();

    let payload = json!({ "store": { "page": { "data": { "results": results } } } }).to_string();
    let escaped = payload
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    format!(
        "<!DOCTYPE html><html><head><title>Songs</title></head><body>\
         <div class=\"js-store\" data-content=\"{}\"></div></body></html>",
        escaped
    )
}

/// Write a document into `dir`, creating it when needed
pub fn write_document(dir: &Path, name: &str, content: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
