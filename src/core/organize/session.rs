//! Caller-owned ingestion session: the working set and its seen-set.

use super::batch::relocate_batch;
use super::planner::PathPlanner;
use super::relocator::Relocator;
use super::types::{BatchSummary, FileRecord};
use crate::config::ArchiveConfig;
use crate::core::identity::{full_identity, quick_identity};
use crate::core::metadata::{MetadataClassifier, MetadataReader};
use crate::core::security::SecurityGate;
use crate::error::{file_label, IngestError, Result, SecurityError};
use crate::events::{CancelToken, Event, EventSender, IngestEvent};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Tally of one `add_path` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub added: usize,
    pub already_seen: usize,
    /// Refused by the security gate or without an identity
    pub blocked: usize,
    pub unsupported: usize,
    /// The working set filled up before every file was considered
    pub limit_reached: bool,
}

impl IngestReport {
    fn absorb(&mut self, result: &std::result::Result<(), IngestError>) {
        match result {
            Ok(()) => self.added += 1,
            Err(IngestError::AlreadySeen { .. }) => self.already_seen += 1,
            Err(IngestError::Unsupported { .. }) => self.unsupported += 1,
            Err(IngestError::FileLimitReached { .. }) => self.limit_reached = true,
            Err(IngestError::Blocked(_)) | Err(IngestError::Unidentifiable { .. }) => {
                self.blocked += 1
            }
        }
    }
}

/// Working set of files waiting to be archived.
///
/// Not shared between threads: the owner adds files, then hands the whole
/// set to [`IngestSession::relocate_all`].
pub struct IngestSession {
    config: ArchiveConfig,
    gate: SecurityGate,
    classifier: MetadataClassifier,
    relocator: Relocator,
    records: Vec<FileRecord>,
    seen: HashSet<String>,
    archive_root: Option<PathBuf>,
}

impl IngestSession {
    /// Session that reads EXIF tags from disk
    pub fn new(config: ArchiveConfig) -> Self {
        let classifier = MetadataClassifier::new(&config);
        Self::build(config, classifier)
    }

    /// Session with a custom metadata reader
    pub fn with_reader(config: ArchiveConfig, reader: Box<dyn MetadataReader>) -> Self {
        let classifier = MetadataClassifier::with_reader(reader, &config);
        Self::build(config, classifier)
    }

    fn build(config: ArchiveConfig, classifier: MetadataClassifier) -> Self {
        Self {
            gate: config.security_gate(),
            relocator: Relocator::new(&config),
            classifier,
            config,
            records: Vec::new(),
            seen: HashSet::new(),
            archive_root: None,
        }
    }

    /// Swap in a preconfigured relocator
    pub fn with_relocator(mut self, relocator: Relocator) -> Self {
        self.relocator = relocator;
        self
    }

    /// Validate the archive folder and keep its contents out of the working set.
    ///
    /// Files under it are refused, and folder drops skip it while walking.
    pub fn set_archive_root(&mut self, root: &Path) -> Result<()> {
        let resolved = self.gate.validate_archive_root(root)?;
        self.archive_root = Some(resolved);
        Ok(())
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn planner(&self) -> &PathPlanner {
        self.relocator.planner()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget every record and every seen identity
    pub fn clear(&mut self) {
        self.records.clear();
        self.seen.clear();
    }

    /// Remove and return the working set; seen identities are kept
    pub fn take_records(&mut self) -> Vec<FileRecord> {
        std::mem::take(&mut self.records)
    }

    /// Add a dropped path: a single file, or a folder searched recursively.
    ///
    /// Surrounding braces, quotes and whitespace left by drag-and-drop are
    /// stripped first. Symlinks inside a folder are never followed.
    pub fn add_path(&mut self, raw: &str, events: &EventSender) -> IngestReport {
        let mut report = IngestReport::default();
        let cleaned = clean_dropped_path(raw);
        if cleaned.is_empty() {
            return report;
        }

        let path: PathBuf = Path::new(cleaned).components().collect();
        if let Err(e) = self.gate.check_source(&path) {
            events.send(rejected(&path, &e.to_string()));
            report.blocked += 1;
            return report;
        }

        if path.is_dir() {
            info!("Scanning folder: {}", file_label(&path));
            let walk_root = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            let archive = self.archive_root.clone();
            let walker = WalkDir::new(walk_root)
                .follow_links(false)
                .into_iter()
                .filter_entry(move |entry| archive.as_deref() != Some(entry.path()));
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping unreadable entry {}", walk_error_label(&e));
                        continue;
                    }
                };
                if entry.file_type().is_dir() {
                    continue;
                }
                self.add_and_report(entry.path(), events, &mut report);
                if report.limit_reached {
                    break;
                }
            }
        } else {
            self.add_and_report(&path, events, &mut report);
        }

        debug!("Ingest report: {:?}", report);
        report
    }

    fn add_and_report(&mut self, path: &Path, events: &EventSender, report: &mut IngestReport) {
        let filename = file_label(path);
        let result = self.add_file(path).map(|_| ());

        match &result {
            Ok(()) => events.send(Event::Ingest(IngestEvent::Added { filename })),
            Err(IngestError::AlreadySeen { .. }) => {
                events.send(Event::Ingest(IngestEvent::AlreadySeen { filename }))
            }
            Err(IngestError::Unsupported { .. }) => {
                debug!("Unsupported file skipped: {}", filename)
            }
            Err(e) => events.send(rejected(path, &e.to_string())),
        }
        report.absorb(&result);
    }

    /// Vet, identify and classify one file, then add it to the working set
    pub fn add_file(&mut self, path: &Path) -> std::result::Result<&FileRecord, IngestError> {
        let name = file_label(path);

        if self.records.len() >= self.config.max_files {
            warn!("File limit reached ({})", self.config.max_files);
            return Err(IngestError::FileLimitReached {
                limit: self.config.max_files,
            });
        }

        self.gate.check_source(path)?;
        if let Some(root) = &self.archive_root {
            self.gate.ensure_outside_root(path, root)?;
        }
        if !path.is_file() || !self.config.is_supported(path) {
            return Err(IngestError::Unsupported { name });
        }

        let quick_hash =
            quick_identity(path).ok_or_else(|| IngestError::Unidentifiable { name: name.clone() })?;
        if self.seen.contains(&quick_hash) {
            debug!("Already added: {}", name);
            return Err(IngestError::AlreadySeen { name });
        }

        let absolute = fs::canonicalize(path).map_err(|source| SecurityError::Unresolvable {
            name: name.clone(),
            source,
        })?;
        let classification = self.classifier.classify(&absolute);
        let full_hash =
            full_identity(&absolute).ok_or_else(|| IngestError::Unidentifiable { name: name.clone() })?;

        let mut record = FileRecord::new(absolute, quick_hash.clone(), classification);
        record.full_hash = Some(full_hash);

        self.seen.insert(quick_hash);
        let index = self.records.len();
        self.records.push(record);
        Ok(&self.records[index])
    }

    /// Archive the whole working set under `archive_root`.
    ///
    /// Moved and duplicate records are removed; failed and cancelled ones
    /// stay for a retry. Errors only when the archive root is unusable or
    /// its volume lacks room. Later drops skip the archive folder.
    pub fn relocate_all(
        &mut self,
        archive_root: &Path,
        events: &EventSender,
        cancel: &CancelToken,
    ) -> Result<BatchSummary> {
        self.set_archive_root(archive_root)?;
        relocate_batch(
            &mut self.records,
            archive_root,
            &self.relocator,
            &self.config,
            events,
            cancel,
        )
    }
}

fn clean_dropped_path(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| c == '{' || c == '}' || c == '"' || c == '\'')
        .trim()
}

/// Basename and cause of a walk error; walkdir's own message has the full path
fn walk_error_label(e: &walkdir::Error) -> String {
    let name = e.path().map(file_label).unwrap_or_default();
    match e.io_error() {
        Some(io) => format!("{}: {}", name, io.kind()),
        None => format!("{}: filesystem loop", name),
    }
}

fn rejected(path: &Path, reason: &str) -> Event {
    Event::Ingest(IngestEvent::Rejected {
        filename: file_label(path),
        reason: reason.to_string(),
    })
}
