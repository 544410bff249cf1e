//! Capture-date and device classification with filesystem fallback.

use super::{decode_tag, EmbeddedTags, ExifMetadataReader, MetadataReader};
use crate::config::ArchiveConfig;
use crate::error::file_label;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Device label used when no embedded model tag is present
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Year/month value when no timestamp source succeeded
pub const UNKNOWN_DATE_PART: &str = "Unknown";

/// Display string when no timestamp source succeeded
pub const NO_DATE_DISPLAY: &str = "No Date Info";

/// Textual timestamp layout used by EXIF
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const FILE_DATE_SUFFIX: &str = " (File)";

/// Where a classification's timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Embedded capture/digitized tag
    Embedded,
    /// Filesystem creation or status-change time
    Filesystem,
    /// No source yielded a date
    Unknown,
}

/// Result of classifying one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub timestamp: Option<NaiveDateTime>,
    pub timestamp_source: TimestampSource,
    /// `YYYY-MM-DD HH:MM`, suffixed with ` (File)` for filesystem dates
    pub date_display: String,
    /// Embedded model, or [`UNKNOWN_DEVICE`]
    pub device: String,
    pub year: String,
    pub month: String,
}

impl Classification {
    /// Classification with no date and no device
    pub fn unknown() -> Self {
        Self {
            timestamp: None,
            timestamp_source: TimestampSource::Unknown,
            date_display: NO_DATE_DISPLAY.to_string(),
            device: UNKNOWN_DEVICE.to_string(),
            year: UNKNOWN_DATE_PART.to_string(),
            month: UNKNOWN_DATE_PART.to_string(),
        }
    }

    /// Whether the device label came from embedded metadata
    pub fn has_embedded_device(&self) -> bool {
        self.device != UNKNOWN_DEVICE
    }

    fn set_timestamp(&mut self, timestamp: NaiveDateTime, source: TimestampSource) {
        let mut display = timestamp.format(DISPLAY_FORMAT).to_string();
        if source == TimestampSource::Filesystem {
            display.push_str(FILE_DATE_SUFFIX);
        }
        self.timestamp = Some(timestamp);
        self.timestamp_source = source;
        self.date_display = display;
        self.year = timestamp.year().to_string();
        self.month = format!("{:02}", timestamp.month());
    }
}

/// Classifies files using embedded metadata, falling back to the filesystem
pub struct MetadataClassifier {
    reader: Box<dyn MetadataReader>,
    size_limit: u64,
    video_extensions: Vec<String>,
}

impl MetadataClassifier {
    /// Classifier backed by the EXIF reader
    pub fn new(config: &ArchiveConfig) -> Self {
        Self::with_reader(Box::new(ExifMetadataReader::new()), config)
    }

    /// Classifier backed by a custom metadata reader
    pub fn with_reader(reader: Box<dyn MetadataReader>, config: &ArchiveConfig) -> Self {
        Self {
            reader,
            size_limit: config.metadata_size_limit,
            video_extensions: config.video_extensions.clone(),
        }
    }

    /// Classify a file. Never fails; unknown parts get their defaults.
    pub fn classify(&self, path: &Path) -> Classification {
        let name = file_label(path);
        let mut result = Classification::unknown();

        if self.should_decode(path, &name) {
            if let Some(tags) = self.reader.read_tags(path) {
                self.apply_tags(&mut result, &tags, &name);
            }
        }

        if result.timestamp.is_none() {
            match self.reader.filesystem_time(path) {
                Some(time) => result.set_timestamp(time, TimestampSource::Filesystem),
                None => warn!("File date reading failed: {}", name),
            }
        }

        result
    }

    /// Large files and videos skip embedded decoding entirely
    fn should_decode(&self, path: &Path, name: &str) -> bool {
        if self.is_video(path) {
            return false;
        }
        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.size_limit => {
                info!(
                    "Large file ({:.1}MB), metadata skipped: {}",
                    meta.len() as f64 / 1e6,
                    name
                );
                false
            }
            Ok(_) => true,
            Err(_) => false,
        }
    }

    fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_lowercase();
                self.video_extensions.iter().any(|v| *v == ext)
            })
            .unwrap_or(false)
    }

    fn apply_tags(&self, result: &mut Classification, tags: &EmbeddedTags, name: &str) {
        if let Some(model) = tags.model.as_deref().map(decode_tag) {
            if !model.is_empty() {
                result.device = model;
            }
        }

        let raw = tags
            .date_time_original
            .as_deref()
            .or(tags.date_time_digitized.as_deref());
        if let Some(raw) = raw {
            let text = decode_tag(raw);
            match NaiveDateTime::parse_from_str(&text, EXIF_DATETIME_FORMAT) {
                Ok(timestamp) => result.set_timestamp(timestamp, TimestampSource::Embedded),
                Err(e) => debug!("EXIF date parsing failed: {} ({})", name, e),
            }
        }
    }
}
