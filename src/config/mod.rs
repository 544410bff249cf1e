//! # Config Module
//!
//! Batch tuning ([`ArchiveConfig`]) and persisted user settings ([`Settings`]).
//!
//! ## Example
//! ```rust,ignore
//! let config = ArchiveConfig::builder()
//!     .conflict_limit(500)
//!     .inter_file_delay(Duration::ZERO)
//!     .build();
//! ```

use crate::core::security::{default_blocked_roots, SecurityGate, MAX_PATH_LENGTH};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Files above this size skip embedded metadata decoding (250MB)
pub const DEFAULT_METADATA_SIZE_LIMIT: u64 = 250 * 1024 * 1024;

/// Numbered-name count that triggers a warning
pub const DEFAULT_CONFLICT_WARNING: usize = 1000;

/// Numbered-name count after which a file is skipped
pub const DEFAULT_CONFLICT_LIMIT: usize = 10_000;

/// Maximum files held in one ingestion session
pub const DEFAULT_MAX_FILES: usize = 10_000;

/// Pause between files in a batch
pub const DEFAULT_INTER_FILE_DELAY: Duration = Duration::from_millis(10);

const SETTINGS_DIR: &str = "lume";
const SETTINGS_FILE: &str = "config.json";

/// Tuning for ingestion and relocation
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Files larger than this skip embedded metadata
    pub metadata_size_limit: u64,
    /// Lowercase extensions treated as video (metadata skipped)
    pub video_extensions: Vec<String>,
    /// Lowercase extensions accepted at ingestion
    pub supported_extensions: Vec<String>,
    /// Counter value that raises a high-conflict warning
    pub conflict_warning_threshold: usize,
    /// Highest `_N` suffix tried before the file is skipped
    pub conflict_limit: usize,
    /// Pause between files in a batch
    pub inter_file_delay: Duration,
    /// Longest accepted input path, in characters
    pub max_path_length: usize,
    /// Capacity of the ingestion working set
    pub max_files: usize,
    /// Protected directories
    pub blocked_roots: Vec<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            metadata_size_limit: DEFAULT_METADATA_SIZE_LIMIT,
            video_extensions: to_strings(&["mov", "mp4", "m4v", "avi", "mkv"]),
            supported_extensions: to_strings(&[
                "jpg", "jpeg", "tiff", "tif", "webp", "png", "heic", "mov", "mp4",
            ]),
            conflict_warning_threshold: DEFAULT_CONFLICT_WARNING,
            conflict_limit: DEFAULT_CONFLICT_LIMIT,
            inter_file_delay: DEFAULT_INTER_FILE_DELAY,
            max_path_length: MAX_PATH_LENGTH,
            max_files: DEFAULT_MAX_FILES,
            blocked_roots: default_blocked_roots(),
        }
    }
}

impl ArchiveConfig {
    /// Start building a configuration from the defaults
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder::new()
    }

    /// Security gate configured from this config
    pub fn security_gate(&self) -> SecurityGate {
        SecurityGate::new()
            .with_blocked_roots(self.blocked_roots.clone())
            .with_max_path_length(self.max_path_length)
    }

    /// Whether the file extension is accepted at ingestion
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_lowercase();
                self.supported_extensions.iter().any(|s| *s == ext)
            })
            .unwrap_or(false)
    }
}

/// Builder for [`ArchiveConfig`]
pub struct ArchiveConfigBuilder {
    config: ArchiveConfig,
}

impl ArchiveConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ArchiveConfig::default(),
        }
    }

    /// Set the embedded-metadata size ceiling in bytes
    pub fn metadata_size_limit(mut self, bytes: u64) -> Self {
        self.config.metadata_size_limit = bytes;
        self
    }

    /// Set the high-conflict warning threshold
    pub fn conflict_warning_threshold(mut self, count: usize) -> Self {
        self.config.conflict_warning_threshold = count;
        self
    }

    /// Set the hard conflict ceiling
    pub fn conflict_limit(mut self, count: usize) -> Self {
        self.config.conflict_limit = count;
        self
    }

    /// Set the pause between files in a batch
    pub fn inter_file_delay(mut self, delay: Duration) -> Self {
        self.config.inter_file_delay = delay;
        self
    }

    /// Set the working-set capacity
    pub fn max_files(mut self, count: usize) -> Self {
        self.config.max_files = count;
        self
    }

    /// Set the longest accepted input path
    pub fn max_path_length(mut self, length: usize) -> Self {
        self.config.max_path_length = length;
        self
    }

    /// Replace the protected directory list
    pub fn blocked_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.blocked_roots = roots;
        self
    }

    /// Replace the accepted extensions
    pub fn supported_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.supported_extensions = extensions
            .into_iter()
            .map(|e| e.to_lowercase())
            .collect();
        self
    }

    pub fn build(self) -> ArchiveConfig {
        self.config
    }
}

impl Default for ArchiveConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted user settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Last archive root chosen by the user
    pub target_folder: Option<PathBuf>,
}

impl Settings {
    /// Default settings file location (`<config dir>/lume/config.json`)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load settings; a missing or corrupt file yields defaults
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No settings loaded: {}", e);
                return Self::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Config file corrupted, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating the directory if needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(ConfigError::Write)
    }

    /// Validate and remember an archive root
    pub fn set_target_folder(
        &mut self,
        folder: &Path,
        gate: &SecurityGate,
    ) -> Result<(), crate::error::SecurityError> {
        let resolved = gate.validate_archive_root(folder)?;
        self.target_folder = Some(resolved);
        Ok(())
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
