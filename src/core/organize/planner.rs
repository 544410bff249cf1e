//! Target path planning: `root/<year>/<month>/<device>/<filename>`.

use super::types::FileRecord;
use crate::core::metadata::{SourceMatch, CAMERA_TAG, UNKNOWN_DEVICE};
use crate::core::sanitizer::sanitize_segment;
use crate::core::security::SecurityGate;
use crate::error::SecurityError;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Bucket for files whose device cannot be inferred
pub const OTHER_DEVICE: &str = "Other";

/// Shortest first filename token accepted as a device name is this plus one
const MIN_TOKEN_LEN: usize = 2;

/// Plans archive targets for file records
#[derive(Debug, Clone)]
pub struct PathPlanner {
    gate: SecurityGate,
}

impl PathPlanner {
    pub fn new(gate: SecurityGate) -> Self {
        Self { gate }
    }

    /// Sanitized `year/month/device/filename`, relative to the archive root
    pub fn plan_relative(&self, record: &FileRecord) -> PathBuf {
        let mut path = PathBuf::new();
        path.push(sanitize_segment(&record.year));
        path.push(sanitize_segment(&record.month));
        path.push(sanitize_segment(&device_segment(record)));
        path.push(&record.filename);
        path
    }

    /// Absolute target for `record` inside `archive_root`.
    ///
    /// The path is returned exactly as planned, never in resolved form.
    /// Fails rather than substituting a different path when the filename is
    /// not a single plain component or the result leaves the root.
    pub fn plan(&self, record: &FileRecord, archive_root: &Path) -> Result<PathBuf, SecurityError> {
        if !is_single_component(&record.filename) {
            warn!("Unsafe filename rejected during planning: {}", record.filename);
            return Err(SecurityError::PathTraversal {
                name: record.filename.clone(),
            });
        }

        let target = archive_root.join(self.plan_relative(record));
        self.gate.ensure_within_root(&target, archive_root)?;
        debug!("Planned {} -> {}", record.filename, target.display());
        Ok(target)
    }
}

impl Default for PathPlanner {
    fn default() -> Self {
        Self::new(SecurityGate::new())
    }
}

/// Folder name for the device level of the archive tree.
///
/// A camera tag adds nothing when the device itself is known, so
/// `IMG_2021.jpg` shot on a Pixel 5 files under `Pixel 5`, while a
/// WhatsApp image from the same phone files under `WhatsApp_Pixel 5`.
pub fn device_segment(record: &FileRecord) -> String {
    match record.source_app.as_deref() {
        Some(CAMERA_TAG) if record.has_embedded_device => record.device_label.clone(),
        Some(tag) => format!("{}_{}", tag, record.device_label),
        None => record.device_label.clone(),
    }
}

/// Device label for a record: the embedded model, else a filename guess.
///
/// The guess is the first `_`/`-`/space separated token of the file stem,
/// capitalized, when the stem has more than one token and the first is
/// longer than two characters. A token that is just the source keyword
/// (`Screenshot_...`, `IMG_...`) names no device, so it lands in `Other`.
pub fn device_label_for(filename: &str, embedded: &str, source: Option<&SourceMatch>) -> String {
    let embedded = embedded.trim();
    if !embedded.is_empty() && embedded != UNKNOWN_DEVICE {
        return embedded.to_string();
    }

    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tokens: Vec<&str> = stem.split(['_', '-', ' ']).collect();

    match tokens.first() {
        Some(first)
            if tokens.len() > 1
                && first.chars().count() > MIN_TOKEN_LEN
                && !source.is_some_and(|s| s.is_keyword_token(first)) =>
        {
            capitalize(first)
        }
        _ => OTHER_DEVICE.to_string(),
    }
}

/// Upper-case the first character and lower-case the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn is_single_component(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
