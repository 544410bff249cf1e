//! # Lume Archiver
//!
//! Files photos and videos from arbitrary folders into a deterministic
//! `year/month/device` archive tree.
//!
//! ## Core Philosophy
//! - **Never lose data** - a source is only removed after a verified copy exists
//! - **Never accumulate duplicates** - byte-identical files are skipped, not renamed
//! - **Never trust input paths** - symlinks, shortcuts and traversal are rejected up front
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - Sanitizing, hashing, classification, planning and relocation
//! - `config` - Batch tuning and persisted user settings
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - Error taxonomy with privacy-aware messages
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ArchiveError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
/// Honors `RUST_LOG`; defaults to `info` when it is unset or invalid.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
