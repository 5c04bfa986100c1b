//! Source document scanner
//!
//! Enumerates every source document under a directory in a fixed order
//! (sorted by path) so repeated batch runs visit documents identically.
//! Hidden entries and common tooling directories are skipped. Symlinks are
//! followed; a linked directory reached twice is visited once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Document scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Source document scanner
pub struct DocumentScanner {
    ignore_patterns: Vec<String>,
    extensions: Option<Vec<String>>,
    max_depth: Option<usize>,
}

impl DocumentScanner {
    /// Scanner accepting every regular, non-hidden file
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
            extensions: None,
            max_depth: None,
        }
    }

    /// Only accept files with one of these extensions (case-insensitive)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        );
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// All documents under `root`, sorted by path
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }

        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut symlink_visited = HashSet::new();
        let mut documents = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.has_accepted_extension(entry.path()) {
                        documents.push(entry.into_path());
                    }
                }
                Err(e) => {
                    // Keep scanning; one unreadable entry must not hide the rest
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        documents.sort();

        tracing::debug!(
            root = %root.display(),
            documents = documents.len(),
            "Document scan complete"
        );

        Ok(documents)
    }

    fn should_process_entry(&self, entry: &DirEntry, symlink_visited: &mut HashSet<PathBuf>) -> bool {
        let file_name = entry.file_name().to_string_lossy();

        if file_name.starts_with('.') {
            return false;
        }

        if self.ignore_patterns.iter().any(|p| file_name.contains(p.as_str())) {
            return false;
        }

        if entry.path_is_symlink() && entry.file_type().is_dir() {
            if let Ok(canonical) = entry.path().canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", entry.path().display());
                    return false;
                }
            }
        }

        true
    }

    fn has_accepted_extension(&self, path: &Path) -> bool {
        match &self.extensions {
            None => true,
            Some(accepted) => path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| accepted.iter().any(|a| *a == ext)),
        }
    }
}

impl Default for DocumentScanner {
    fn default() -> Self {
        Self::new()
    }
}
