//! Copy-verify-delete relocation of a single file.
//!
//! A source is removed only after a byte-identical copy has been verified at
//! the target, so a file never exists nowhere. Files are never renamed in
//! place, even on the same filesystem.

use super::conflict::ConflictResolver;
use super::planner::PathPlanner;
use super::types::{FailureReason, FileRecord, MoveOutcome};
use crate::config::ArchiveConfig;
use crate::core::identity::try_full_identity;
use crate::core::security::SecurityGate;
use crate::error::{file_label, RelocateError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Copies `source` to a target that must not exist yet
pub type CopyFn = Box<dyn Fn(&Path, &Path) -> io::Result<()> + Send + Sync>;

/// Deletes a source once its copy is verified
pub type RemoveFn = Box<dyn Fn(&Path) -> io::Result<()> + Send + Sync>;

/// Moves file records into the archive
pub struct Relocator {
    gate: SecurityGate,
    planner: PathPlanner,
    resolver: ConflictResolver,
    copy_fn: CopyFn,
    remove_fn: RemoveFn,
}

impl Relocator {
    pub fn new(config: &ArchiveConfig) -> Self {
        let gate = config.security_gate();
        Self {
            planner: PathPlanner::new(gate.clone()),
            resolver: ConflictResolver::from_config(config),
            gate,
            copy_fn: Box::new(copy_preserving),
            remove_fn: Box::new(|path| fs::remove_file(path)),
        }
    }

    /// Replace the copy step (used to simulate faulty storage)
    pub fn with_copy_fn(mut self, copy_fn: CopyFn) -> Self {
        self.copy_fn = copy_fn;
        self
    }

    /// Replace the source deletion step (used to simulate locked sources)
    pub fn with_remove_fn(mut self, remove_fn: RemoveFn) -> Self {
        self.remove_fn = remove_fn;
        self
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    /// Relocate one record. Every error becomes a `Failed` outcome.
    ///
    /// Fills in `record.full_hash` when it was not computed at ingestion.
    pub fn relocate(&self, record: &mut FileRecord, archive_root: &Path) -> MoveOutcome {
        match self.try_relocate(record, archive_root) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Move failed: {}", e);
                MoveOutcome::Failed {
                    reason: FailureReason::from(&e),
                }
            }
        }
    }

    /// Relocate one record, returning the typed error on failure
    pub fn try_relocate(
        &self,
        record: &mut FileRecord,
        archive_root: &Path,
    ) -> Result<MoveOutcome, RelocateError> {
        let source = record.source_path.clone();
        let name = record.filename.clone();

        if fs::symlink_metadata(&source).is_err() {
            warn!("Source file not found: {}", name);
            return Err(RelocateError::SourceMissing { name });
        }
        self.gate.check_source(&source)?;
        self.gate.ensure_outside_root(&source, archive_root)?;

        let planned = self.planner.plan(record, archive_root)?;
        let resolution = self.resolver.resolve(&source, &planned)?;
        if resolution.is_duplicate {
            info!("Duplicate skipped: {}", name);
            return Ok(MoveOutcome::DuplicateSkipped {
                existing: resolution.path,
            });
        }
        self.gate.ensure_within_root(&resolution.path, archive_root)?;
        let target = resolution.path;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| RelocateError::CreateDirectory {
                name: name.clone(),
                source,
            })?;
        }

        let reference = match record.full_hash.clone() {
            Some(hash) => hash,
            None => {
                let hash = try_full_identity(&source)?;
                record.full_hash = Some(hash.clone());
                hash
            }
        };

        if let Err(source_err) = (self.copy_fn)(&source, &target) {
            if source_err.kind() != io::ErrorKind::AlreadyExists {
                discard_partial_copy(&target);
            }
            return Err(RelocateError::Copy {
                name,
                source: source_err,
            });
        }

        let verified = match try_full_identity(&target) {
            Ok(digest) => digest == reference,
            Err(e) => {
                warn!("Could not hash copy of {}: {}", name, e);
                false
            }
        };
        if !verified {
            error!("Integrity check failed: {}", name);
            if let Err(e) = fs::remove_file(&target) {
                error!(
                    "CRITICAL: corrupt copy of {} could not be removed ({}); source preserved",
                    name, e
                );
            }
            return Err(RelocateError::IntegrityMismatch { name });
        }

        let source_retained = match (self.remove_fn)(&source) {
            Ok(()) => false,
            Err(e) => {
                warn!(
                    "Copied but source could not be deleted: {} ({}). Remove it manually.",
                    name, e
                );
                true
            }
        };

        info!("Moved: {} -> {}", name, file_label(&target));
        debug!("Archive path: {}", target.display());
        Ok(MoveOutcome::Moved {
            target,
            source_retained,
        })
    }
}

/// Copy bytes into a new file, then carry over mtime and permissions.
///
/// Fails with `AlreadyExists` instead of overwriting an archived file.
pub fn copy_preserving(source: &Path, target: &Path) -> io::Result<()> {
    let input = File::open(source)?;
    let meta = input.metadata()?;
    let output = OpenOptions::new().write(true).create_new(true).open(target)?;

    let mut reader = BufReader::new(input);
    let mut writer = BufWriter::new(output);
    io::copy(&mut reader, &mut writer)?;
    writer.flush()?;

    let output = writer.into_inner().map_err(|e| e.into_error())?;
    if let Ok(modified) = meta.modified() {
        output.set_modified(modified)?;
    }
    output.sync_all()?;
    drop(output);

    fs::set_permissions(target, meta.permissions())
}

fn discard_partial_copy(target: &Path) {
    if fs::symlink_metadata(target).is_ok() {
        if let Err(e) = fs::remove_file(target) {
            error!(
                "CRITICAL: partial copy {} could not be removed: {}",
                file_label(target),
                e
            );
        }
    }
}
