//! # Error Module
//!
//! Error taxonomy for the archiver.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Per-file errors stay per-file** - a batch turns them into outcomes
//! - **Privacy-aware messages** - errors name files, not absolute paths
//! - **Recovery hints** - suggest how to fix when possible

use std::io;
use std::path::Path;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Security check failed: {0}")]
    Security(#[from] SecurityError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No supported files to organize")]
    NoFiles,

    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

/// Rejections raised by the security gate before any file I/O happens
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Symbolic link or junction blocked: {name}")]
    SymlinkBlocked { name: String },

    #[error("Shortcut file blocked: {name}")]
    ShortcutBlocked { name: String },

    #[error("Path traversal blocked: {name}")]
    PathTraversal { name: String },

    #[error("Protected system location blocked: {name}")]
    SystemPathBlocked { name: String },

    #[error("Path is too long ({length} > {limit} characters): {name}")]
    PathTooLong {
        name: String,
        length: usize,
        limit: usize,
    },

    #[error("Target for {name} resolves outside the archive root")]
    OutsideArchiveRoot { name: String },

    #[error("Archive folder does not exist: {name}. Choose an existing folder.")]
    ArchiveRootMissing { name: String },

    #[error("Archive location is not a folder: {name}")]
    ArchiveRootNotDirectory { name: String },

    #[error("Archive folder is not writable: {name}. Check its permissions.")]
    ArchiveRootNotWritable {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Already inside the archive folder: {name}")]
    InsideArchiveRoot { name: String },

    #[error("Not enough free space in {name}: need {required} bytes, {available} available")]
    InsufficientSpace {
        name: String,
        required: u64,
        available: u64,
    },

    #[error("Could not resolve {name}: {source}")]
    Unresolvable {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Errors that occur while computing file identities
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Permission denied: {name}")]
    PermissionDenied {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("File not found: {name}")]
    NotFound { name: String },

    #[error("Symbolic link rejected while hashing: {name}")]
    SymlinkRejected { name: String },

    #[error("Failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Map an I/O failure to the matching identity error
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let name = file_label(path);
        match source.kind() {
            io::ErrorKind::PermissionDenied => HashError::PermissionDenied { name, source },
            io::ErrorKind::NotFound => HashError::NotFound { name },
            _ => HashError::Io { name, source },
        }
    }
}

/// Errors that occur while resolving naming conflicts in the archive
#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("Conflict limit exceeded ({limit} numbered names in use) for: {name}")]
    LimitExceeded { name: String, limit: usize },
}

/// Errors that stop a single file from being relocated
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("Source file not found: {name}")]
    SourceMissing { name: String },

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("Failed to create folder for {name}: {source}")]
    CreateDirectory {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy {name}: {source}")]
    Copy {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Integrity check failed for {name}; the source was preserved")]
    IntegrityMismatch { name: String },
}

/// Reasons a candidate file is not added to the working set
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Blocked(#[from] SecurityError),

    #[error("Unsupported file type: {name}")]
    Unsupported { name: String },

    #[error("Already added in this session: {name}")]
    AlreadySeen { name: String },

    #[error("Could not establish identity for {name}")]
    Unidentifiable { name: String },

    #[error("File limit reached ({limit} files). Organize or clear the list first.")]
    FileLimitReached { limit: usize },
}

/// Errors reading or writing persisted settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration directory is available on this system")]
    NoConfigDir,

    #[error("Failed to write settings: {0}")]
    Write(#[source] io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No archive folder configured. Pass --archive or run `lume set-archive <DIR>`.")]
    MissingArchiveRoot,
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// File name used in messages and logs instead of the full path
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<unnamed>".to_string())
}
