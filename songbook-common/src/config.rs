//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SONGBOOK_ROOT_FOLDER`, then `SONGBOOK_ROOT`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! Missing or unreadable TOML files never abort startup: they are logged and
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary environment variable for the root folder
pub const ENV_ROOT_FOLDER: &str = "SONGBOOK_ROOT_FOLDER";

/// Alternative (shorter) environment variable for the root folder
pub const ENV_ROOT: &str = "SONGBOOK_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "songbook.db";

/// Bootstrap configuration shared by all songbook services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for data files (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values compiled into the binary, used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/songbook (or /var/lib/songbook for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("songbook"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/songbook"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/songbook
        dirs::data_dir()
            .map(|d| d.join("songbook"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/songbook"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\songbook
        dirs::data_local_dir()
            .map(|d| d.join("songbook"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\songbook"))
    } else {
        PathBuf::from("./songbook_data")
    }
}

/// Default per-module TOML path: `<config_dir>/songbook/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("songbook").join(format!("{}.toml", module_name)))
}

/// Load a TOML document into `T`
///
/// A missing file yields `T::default()`; a present but malformed file is an error.
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write a TOML document atomically (temp file + rename)
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    crate::fs_utils::write_atomic(path, content.as_bytes())
}

/// Resolves the root folder for a module
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_override: None,
            config_path: default_config_path(module_name),
        }
    }

    /// Command-line value, highest priority when present
    pub fn with_cli_override(mut self, root: Option<PathBuf>) -> Self {
        self.cli_override = root;
        self
    }

    /// Use a specific TOML file instead of the per-module default
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Resolve the root folder; never fails
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_override {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Ok(path) = std::env::var(ENV_ROOT) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(config_path) = &self.config_path {
            match load_toml_config::<TomlConfig>(config_path) {
                Ok(TomlConfig {
                    root_folder: Some(root),
                    ..
                }) => return root,
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        module = %self.module_name,
                        error = %e,
                        "Ignoring unreadable config file, falling back to defaults"
                    );
                }
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first run
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            tracing::info!(root = %self.root_folder.display(), "Created root folder");
        } else if !self.root_folder.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                self.root_folder.display()
            )));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
