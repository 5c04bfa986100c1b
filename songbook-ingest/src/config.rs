//! Configuration resolution for songbook-ingest
//!
//! Priority: CLI flag → environment → TOML → compiled default.
//!
//! The root folder itself is resolved by `songbook_common::config`. Every
//! other path here is taken relative to the root folder unless absolute.
//!
//! ```toml
//! root_folder = "/srv/songbook"
//!
//! [logging]
//! level = "debug"
//!
//! [ingest]
//! source_dir = "pages"
//! extensions = ["html", "htm"]
//! max_depth = 2
//! results_path = ["store", "page", "data", "results"]
//! reprocess_threshold = 10
//! candidate_delay_ms = 100
//!
//! [tool]
//! path = "/usr/local/bin/songbook-tool"
//! timeout_ms = 30000
//! retries = 3
//! ```

use crate::services::ingestion_orchestrator::{
    OrchestratorSettings, DEFAULT_CANDIDATE_DELAY, DEFAULT_DOCUMENT_DELAY, REPROCESS_THRESHOLD,
};
use crate::services::document_scanner::DocumentScanner;
use crate::services::retry_queue::RETRY_THRESHOLD;
use crate::services::song_extractor::SongExtractor;
use crate::services::tool_invoker::DEFAULT_RETRY_DELAY;
use serde::{Deserialize, Serialize};
use songbook_common::config::{LoggingConfig, DATABASE_FILE_NAME};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Module name used for the default TOML path
pub const MODULE_NAME: &str = "songbook-ingest";

/// Environment variable naming the external tool executable
pub const ENV_TOOL_PATH: &str = "SONGBOOK_TOOL_PATH";

pub const DEFAULT_SOURCE_DIR: &str = "sources";
pub const DEFAULT_QUEUE_FILE: &str = "retry_queue.json";
pub const DEFAULT_ARCHIVE_FILE: &str = "dead_letter.json";
pub const DEFAULT_RAW_DIR: &str = "raw";

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TOOL_RETRIES: u32 = 3;

/// songbook-ingest TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestTomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ingest: IngestSection,

    #[serde(default)]
    pub tool: ToolSection,
}

/// `[ingest]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSection {
    pub source_dir: Option<PathBuf>,
    /// Accepted document extensions; every file when absent
    pub extensions: Option<Vec<String>>,
    /// Deepest directory level scanned below `source_dir`
    pub max_depth: Option<usize>,
    /// Key path to the item list inside the embedded payload
    pub results_path: Option<Vec<String>>,
    pub database_path: Option<PathBuf>,
    pub queue_path: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
    pub retry_threshold: Option<u32>,
    pub reprocess_threshold: Option<usize>,
    pub candidate_delay_ms: Option<u64>,
    pub document_delay_ms: Option<u64>,
}

/// `[tool]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSection {
    pub path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

/// Values given on the command line; `None` defers to lower tiers
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub source_dir: Option<PathBuf>,
    pub tool_path: Option<PathBuf>,
    pub tool_timeout_ms: Option<u64>,
    pub tool_retries: Option<u32>,
    pub log_level: Option<String>,
}

/// External tool settings
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    /// Explicit executable; `None` means PATH lookup
    pub path: Option<PathBuf>,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    pub root_folder: PathBuf,
    pub source_dir: PathBuf,
    pub extensions: Option<Vec<String>>,
    pub max_depth: Option<usize>,
    pub results_path: Option<Vec<String>>,
    pub database_path: PathBuf,
    pub queue_path: PathBuf,
    pub archive_path: PathBuf,
    pub raw_dir: PathBuf,
    pub retry_threshold: u32,
    pub reprocess_threshold: usize,
    pub candidate_delay: Duration,
    pub document_delay: Duration,
    pub log_level: String,
    pub tool: ToolSettings,
}

impl IngestSettings {
    /// Merge CLI overrides, environment and TOML over compiled defaults
    ///
    /// `SONGBOOK_TOOL_PATH` is read here; clap also binds it to the CLI
    /// flag, so both entry points agree.
    pub fn resolve(root_folder: PathBuf, toml: &IngestTomlConfig, cli: &CliOverrides) -> Self {
        let ingest = &toml.ingest;
        let tool = &toml.tool;

        let under_root = |path: Option<&PathBuf>, default: &str| -> PathBuf {
            let path = path.cloned().unwrap_or_else(|| PathBuf::from(default));
            if path.is_absolute() {
                path
            } else {
                root_folder.join(path)
            }
        };

        let source_dir = match &cli.source_dir {
            Some(dir) => dir.clone(),
            None => under_root(ingest.source_dir.as_ref(), DEFAULT_SOURCE_DIR),
        };

        let tool_path = cli
            .tool_path
            .clone()
            .or_else(|| std::env::var_os(ENV_TOOL_PATH).map(PathBuf::from))
            .or_else(|| tool.path.clone());

        Self {
            source_dir,
            extensions: ingest.extensions.clone().filter(|e| !e.is_empty()),
            max_depth: ingest.max_depth,
            results_path: ingest.results_path.clone().filter(|p| !p.is_empty()),
            database_path: under_root(ingest.database_path.as_ref(), DATABASE_FILE_NAME),
            queue_path: under_root(ingest.queue_path.as_ref(), DEFAULT_QUEUE_FILE),
            archive_path: under_root(ingest.archive_path.as_ref(), DEFAULT_ARCHIVE_FILE),
            raw_dir: root_folder.join(DEFAULT_RAW_DIR),
            retry_threshold: ingest.retry_threshold.unwrap_or(RETRY_THRESHOLD).max(1),
            reprocess_threshold: ingest.reprocess_threshold.unwrap_or(REPROCESS_THRESHOLD),
            candidate_delay: ingest
                .candidate_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CANDIDATE_DELAY),
            document_delay: ingest
                .document_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DOCUMENT_DELAY),
            log_level: cli
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            tool: ToolSettings {
                path: tool_path,
                timeout: cli
                    .tool_timeout_ms
                    .or(tool.timeout_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_TOOL_TIMEOUT),
                retries: cli
                    .tool_retries
                    .or(tool.retries)
                    .unwrap_or(DEFAULT_TOOL_RETRIES)
                    .max(1),
                retry_delay: tool
                    .retry_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_RETRY_DELAY),
            },
            root_folder,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            source_dir: self.source_dir.clone(),
            reprocess_threshold: self.reprocess_threshold,
            candidate_delay: self.candidate_delay,
            document_delay: self.document_delay,
        }
    }

    pub fn document_scanner(&self) -> DocumentScanner {
        let mut scanner = DocumentScanner::new();
        if let Some(extensions) = &self.extensions {
            scanner = scanner.with_extensions(extensions);
        }
        if let Some(depth) = self.max_depth {
            scanner = scanner.with_max_depth(depth);
        }
        scanner
    }

    pub fn song_extractor(&self) -> SongExtractor {
        match &self.results_path {
            Some(path) => SongExtractor::new().with_results_path(path),
            None => SongExtractor::new(),
        }
    }
}

/// Load the TOML file; a missing file is logged and yields defaults
pub fn load_config(path: &Path) -> songbook_common::Result<IngestTomlConfig> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(IngestTomlConfig::default());
    }

    songbook_common::config::load_toml_config(path)
}
