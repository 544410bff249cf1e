//! # Metadata Module
//!
//! Classifies media files by capture date, device and source application.
//!
//! ## Extracted Fields
//! - Capture timestamp (DateTimeOriginal, then DateTimeDigitized)
//! - Device label (camera Model tag)
//! - Source application, inferred from the filename alone
//!
//! Embedded metadata is read through the [`MetadataReader`] seam; the
//! default implementation uses `kamadak-exif`. Missing or unreadable
//! metadata is never an error: classification falls back to filesystem
//! timestamps.

mod classifier;
mod source;

pub use classifier::{
    Classification, MetadataClassifier, TimestampSource, EXIF_DATETIME_FORMAT, NO_DATE_DISPLAY,
    UNKNOWN_DATE_PART, UNKNOWN_DEVICE,
};
pub use source::{detect_source_app, match_source, SourceMatch, CAMERA_TAG, SOURCE_PATTERNS};

use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Raw embedded tag values, exactly as stored in the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedTags {
    /// Camera/device model string
    pub model: Option<Vec<u8>>,
    /// Original capture time, `YYYY:MM:DD HH:MM:SS`
    pub date_time_original: Option<Vec<u8>>,
    /// Digitization time, used when the original is absent
    pub date_time_digitized: Option<Vec<u8>>,
}

impl EmbeddedTags {
    /// Check if any tag was found
    pub fn has_data(&self) -> bool {
        self.model.is_some()
            || self.date_time_original.is_some()
            || self.date_time_digitized.is_some()
    }
}

/// Source of embedded tags and filesystem timestamps.
///
/// Implement this trait to plug in another metadata decoder (or a fixed
/// one for testing).
pub trait MetadataReader: Send + Sync {
    /// Decode embedded tags; `None` for unsupported or absent metadata
    fn read_tags(&self, path: &Path) -> Option<EmbeddedTags>;

    /// Filesystem timestamp used when no embedded capture time is usable.
    ///
    /// Prefers the creation time, then the inode change time (Unix), then
    /// the modification time. Returned in local time.
    fn filesystem_time(&self, path: &Path) -> Option<NaiveDateTime> {
        let meta = fs::metadata(path).ok()?;
        let time = meta
            .created()
            .ok()
            .or_else(|| status_change_time(&meta))
            .or_else(|| meta.modified().ok())?;
        Some(DateTime::<Local>::from(time).naive_local())
    }
}

/// Metadata reader backed by `kamadak-exif`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataReader;

impl ExifMetadataReader {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataReader for ExifMetadataReader {
    fn read_tags(&self, path: &Path) -> Option<EmbeddedTags> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(e) => {
                debug!("EXIF loading failed: {} ({})", crate::error::file_label(path), e);
                return None;
            }
        };

        let ascii = |tag: Tag| {
            exif.get_field(tag, In::PRIMARY)
                .and_then(|field| ascii_bytes(&field.value))
        };

        let tags = EmbeddedTags {
            model: ascii(Tag::Model),
            date_time_original: ascii(Tag::DateTimeOriginal),
            date_time_digitized: ascii(Tag::DateTimeDigitized),
        };

        tags.has_data().then_some(tags)
    }
}

/// Decode a byte-string tag value.
///
/// UTF-8 first, falling back to a lossless single-byte (Latin-1) decoding,
/// then NUL terminators and surrounding whitespace are stripped.
pub fn decode_tag(bytes: &[u8]) -> String {
    let decoded = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    };
    decoded.trim_matches('\0').trim().to_string()
}

/// Helper to extract the first component of an EXIF ASCII value
fn ascii_bytes(value: &Value) -> Option<Vec<u8>> {
    if let Value::Ascii(ref vec) = value {
        return vec.first().cloned();
    }
    None
}

#[cfg(unix)]
fn status_change_time(meta: &fs::Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    let secs = u64::try_from(meta.ctime()).ok()?;
    Some(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs))
}

#[cfg(not(unix))]
fn status_change_time(_meta: &fs::Metadata) -> Option<SystemTime> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tags_have_no_data() {
        assert!(!EmbeddedTags::default().has_data());
    }

    #[test]
    fn tags_with_model_have_data() {
        let tags = EmbeddedTags {
            model: Some(b"Pixel 5".to_vec()),
            ..Default::default()
        };
        assert!(tags.has_data());
    }

    #[test]
    fn decode_strips_nul_and_whitespace() {
        assert_eq!(decode_tag(b"iPhone 15 Pro\0\0"), "iPhone 15 Pro");
        assert_eq!(decode_tag(b"  Pixel 5 \0"), "Pixel 5");
    }

    #[test]
    fn decode_falls_back_to_latin1() {
        // 0xE9 alone is invalid UTF-8 but is 'é' in Latin-1
        assert_eq!(decode_tag(&[b'C', b'a', b'f', 0xE9]), "Café");
    }

    #[test]
    fn exif_reader_tolerates_missing_file() {
        let reader = ExifMetadataReader::new();
        assert!(reader.read_tags(Path::new("/nonexistent/file.jpg")).is_none());
    }

    #[test]
    fn exif_reader_tolerates_non_image() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("fake.jpg");
        fs::write(&path, b"this is not a jpeg").unwrap();
        assert!(ExifMetadataReader::new().read_tags(&path).is_none());
    }

    #[test]
    fn filesystem_time_is_available_for_real_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("a.png");
        fs::write(&path, b"x").unwrap();
        assert!(ExifMetadataReader::new().filesystem_time(&path).is_some());
    }
}
