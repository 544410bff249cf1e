//! Types for the organize module.

use crate::core::metadata::{match_source, Classification, TimestampSource};
use crate::error::{file_label, RelocateError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::planner::device_label_for;

/// One ingested file, as shown to the user and consumed by the relocator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the file to archive
    pub source_path: PathBuf,
    /// Basename; never changes once set
    pub filename: String,
    /// `size_mtime_prefix8`, the in-session duplicate key
    pub quick_hash: String,
    /// Full content digest, filled lazily before a move
    pub full_hash: Option<String>,
    pub capture_timestamp: Option<NaiveDateTime>,
    pub timestamp_source: TimestampSource,
    /// Human-readable date, e.g. `2023-01-05 09:15 (File)`
    pub date_display: String,
    pub year: String,
    pub month: String,
    /// Embedded model, or a label inferred from the filename
    pub device_label: String,
    /// Whether `device_label` came from embedded metadata
    pub has_embedded_device: bool,
    /// Source application tag (WhatsApp, Screenshots, Camera, ...)
    pub source_app: Option<String>,
}

impl FileRecord {
    /// Build a record from a quick identity and a classification
    pub fn new(source_path: PathBuf, quick_hash: String, classification: Classification) -> Self {
        let filename = file_label(&source_path);
        let source = match_source(&filename);
        let has_embedded_device = classification.has_embedded_device();
        let device_label = device_label_for(&filename, &classification.device, source.as_ref());

        Self {
            source_path,
            filename,
            quick_hash,
            full_hash: None,
            capture_timestamp: classification.timestamp,
            timestamp_source: classification.timestamp_source,
            date_display: classification.date_display,
            year: classification.year,
            month: classification.month,
            device_label,
            has_embedded_device,
            source_app: source.map(|s| s.tag.to_string()),
        }
    }
}

/// Terminal result of relocating one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// A verified copy exists at `target`.
    ///
    /// `source_retained` is set when the source could not be deleted
    /// afterwards and was left for manual cleanup.
    Moved { target: PathBuf, source_retained: bool },
    /// Byte-identical content already exists at `existing`; source untouched
    DuplicateSkipped { existing: PathBuf },
    /// Nothing changed in the archive for this file; source untouched
    Failed { reason: FailureReason },
}

impl MoveOutcome {
    /// Whether this outcome removes the record from the working set
    pub fn is_terminal_success(&self) -> bool {
        !matches!(self, MoveOutcome::Failed { .. })
    }
}

/// Error category of a failed relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unsafe path: symlink, traversal, outside the archive root
    Validation,
    /// Source vanished or could not be hashed
    Identity,
    /// Too many same-named files
    Conflict,
    /// Post-copy digest mismatch
    Integrity,
    /// Directory creation or copy failure (disk full, permissions)
    Resource,
}

/// Display-friendly failure description (file names only, no full paths)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&RelocateError> for FailureReason {
    fn from(err: &RelocateError) -> Self {
        let kind = match err {
            RelocateError::Security(_) => FailureKind::Validation,
            RelocateError::SourceMissing { .. } | RelocateError::Hash(_) => FailureKind::Identity,
            RelocateError::Conflict(_) => FailureKind::Conflict,
            RelocateError::IntegrityMismatch { .. } => FailureKind::Integrity,
            RelocateError::CreateDirectory { .. } | RelocateError::Copy { .. } => {
                FailureKind::Resource
            }
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Summary of a relocation batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub moved: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Files not attempted because the batch was cancelled
    pub not_attempted: usize,
    /// Moved files whose source could not be deleted
    pub sources_retained: usize,
    pub cancelled: bool,
    pub duration_ms: u64,
    /// (filename, reason) for every failed file
    pub failures: Vec<(String, FailureReason)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::UNKNOWN_DEVICE;
    use crate::error::{ConflictError, SecurityError};

    #[test]
    fn record_infers_source_and_device() {
        let mut classification = Classification::unknown();
        classification.device = "Pixel 5".to_string();
        let record = FileRecord::new(
            PathBuf::from("/drop/IMG_2021.jpg"),
            "12_0_abcdef01".to_string(),
            classification,
        );

        assert_eq!(record.filename, "IMG_2021.jpg");
        assert_eq!(record.source_app.as_deref(), Some("Camera"));
        assert_eq!(record.device_label, "Pixel 5");
        assert!(record.has_embedded_device);
        assert!(record.full_hash.is_none());
    }

    #[test]
    fn record_without_device_uses_filename() {
        let record = FileRecord::new(
            PathBuf::from("/drop/Holiday_beach.jpg"),
            "q".to_string(),
            Classification::unknown(),
        );
        assert_eq!(record.device_label, "Holiday");
        assert!(!record.has_embedded_device);
        assert_ne!(record.device_label, UNKNOWN_DEVICE);
        assert!(record.source_app.is_none());
    }

    #[test]
    fn failure_reasons_follow_the_taxonomy() {
        let conflict = RelocateError::Conflict(ConflictError::LimitExceeded {
            name: "a.jpg".to_string(),
            limit: 3,
        });
        assert_eq!(FailureReason::from(&conflict).kind, FailureKind::Conflict);

        let outside = RelocateError::Security(SecurityError::OutsideArchiveRoot {
            name: "a.jpg".to_string(),
        });
        assert_eq!(FailureReason::from(&outside).kind, FailureKind::Validation);

        let missing = RelocateError::SourceMissing {
            name: "a.jpg".to_string(),
        };
        assert_eq!(FailureReason::from(&missing).kind, FailureKind::Identity);
    }

    #[test]
    fn only_failures_stay_in_the_working_set() {
        assert!(MoveOutcome::DuplicateSkipped {
            existing: PathBuf::from("/a")
        }
        .is_terminal_success());
        assert!(!MoveOutcome::Failed {
            reason: FailureReason {
                kind: FailureKind::Resource,
                message: "disk full".to_string(),
            }
        }
        .is_terminal_success());
    }
}
