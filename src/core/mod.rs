//! # Core Module
//!
//! The GUI-agnostic archiving engine.
//!
//! ## Modules
//! - `sanitizer` - Makes year/month/device strings safe as folder names
//! - `security` - Rejects symlinks, shortcuts, traversal and system folders
//! - `identity` - Quick (4KB prefix) and full content fingerprints
//! - `metadata` - Capture date, device and source-app classification
//! - `organize` - Target planning, conflict resolution and safe relocation
//!
//! Data flows in that order: a raw path is vetted by `security`, identified
//! by `identity`, classified by `metadata`, and finally planned and moved by
//! `organize`.

pub mod identity;
pub mod metadata;
pub mod organize;
pub mod sanitizer;
pub mod security;

// Re-export commonly used types
pub use metadata::{Classification, ExifMetadataReader, MetadataClassifier, MetadataReader};
pub use organize::{FileRecord, IngestSession, MoveOutcome, PathPlanner, Relocator};
pub use sanitizer::sanitize_segment;
pub use security::SecurityGate;
