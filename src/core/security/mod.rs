//! # Security Module
//!
//! Cross-cutting path validation consulted before any file is read,
//! planned or written.
//!
//! ## Checks
//! - Symbolic links and junctions are never followed as sources
//! - `.lnk` shortcuts are never ingested
//! - `..` components are rejected outright (no normalization first)
//! - Protected system directories are blocked for sources and the archive root
//! - Every planned target must resolve strictly inside the archive root
//! - Sources already inside the archive are never ingested again
//! - A batch only starts when the archive volume has room for it

use crate::error::{file_label, SecurityError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use sysinfo::Disks;
use tracing::{debug, warn};

/// Longest accepted input path, in characters (Windows MAX_PATH)
pub const MAX_PATH_LENGTH: usize = 260;

const WRITE_PROBE_NAME: &str = ".lume_write_test";

/// Path validator shared by ingestion, planning and relocation
#[derive(Debug, Clone)]
pub struct SecurityGate {
    blocked_roots: Vec<PathBuf>,
    max_path_length: usize,
}

impl SecurityGate {
    /// Create a gate with the platform's protected directories
    pub fn new() -> Self {
        Self {
            blocked_roots: default_blocked_roots(),
            max_path_length: MAX_PATH_LENGTH,
        }
    }

    /// Replace the list of protected directories
    pub fn with_blocked_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.blocked_roots = roots;
        self
    }

    /// Override the maximum accepted path length
    pub fn with_max_path_length(mut self, limit: usize) -> Self {
        self.max_path_length = limit;
        self
    }

    /// Vet a candidate source file or dropped folder.
    pub fn check_source(&self, path: &Path) -> Result<(), SecurityError> {
        let name = file_label(path);

        let length = path.as_os_str().to_string_lossy().chars().count();
        if length > self.max_path_length {
            return Err(SecurityError::PathTooLong {
                name,
                length,
                limit: self.max_path_length,
            });
        }

        if has_parent_component(path) {
            warn!("Path traversal attempt blocked: {}", name);
            return Err(SecurityError::PathTraversal { name });
        }

        if is_shortcut(path) {
            warn!("Shortcut file blocked: {}", name);
            return Err(SecurityError::ShortcutBlocked { name });
        }

        let link_meta = fs::symlink_metadata(path).map_err(|source| SecurityError::Unresolvable {
            name: name.clone(),
            source,
        })?;
        if link_meta.file_type().is_symlink() || is_reparse_point(&link_meta) {
            warn!("Symlink/junction blocked: {}", name);
            return Err(SecurityError::SymlinkBlocked { name });
        }

        let resolved = fs::canonicalize(path).map_err(|source| SecurityError::Unresolvable {
            name: name.clone(),
            source,
        })?;
        if self.is_blocked(&resolved) {
            warn!("System path blocked: {}", name);
            return Err(SecurityError::SystemPathBlocked { name });
        }

        Ok(())
    }

    /// Validate an archive root and return its resolved form.
    ///
    /// The root must exist, be a directory, be writable, and must not be (or
    /// resolve into) a protected system directory. Batches call this on every
    /// start, not only when the folder is chosen.
    pub fn validate_archive_root(&self, root: &Path) -> Result<PathBuf, SecurityError> {
        let name = file_label(root);

        let meta = match fs::metadata(root) {
            Ok(meta) => meta,
            Err(_) => return Err(SecurityError::ArchiveRootMissing { name }),
        };
        if !meta.is_dir() {
            return Err(SecurityError::ArchiveRootNotDirectory { name });
        }

        let resolved = fs::canonicalize(root).map_err(|source| SecurityError::Unresolvable {
            name: name.clone(),
            source,
        })?;

        if self.is_blocked(&resolved) {
            tracing::error!("System directory blocked as archive root");
            return Err(SecurityError::SystemPathBlocked { name });
        }

        probe_writable(&resolved)
            .map_err(|source| SecurityError::ArchiveRootNotWritable { name, source })?;

        Ok(resolved)
    }

    /// Assert that `target` resolves to a strict descendant of `root`.
    ///
    /// The target does not need to exist yet: its deepest existing ancestor
    /// directory is resolved and the remaining components are appended
    /// lexically. The final component is never resolved, so a link sitting
    /// at the target name is judged by where it sits, not where it points.
    /// The resolved form is for checking only; callers keep their own path.
    pub fn ensure_within_root(&self, target: &Path, root: &Path) -> Result<PathBuf, SecurityError> {
        let name = file_label(target);

        let resolved_root = fs::canonicalize(root).map_err(|source| SecurityError::Unresolvable {
            name: file_label(root),
            source,
        })?;
        let resolved_target = resolve_lenient(target).ok_or_else(|| {
            warn!("Security: invalid target path for {}", name);
            SecurityError::OutsideArchiveRoot { name: name.clone() }
        })?;

        if resolved_target == resolved_root || !resolved_target.starts_with(&resolved_root) {
            warn!("Security: target escapes the archive root for {}", name);
            return Err(SecurityError::OutsideArchiveRoot { name });
        }

        Ok(resolved_target)
    }

    /// Refuse a source that already lives inside the archive root
    pub fn ensure_outside_root(&self, path: &Path, root: &Path) -> Result<(), SecurityError> {
        let name = file_label(path);
        let resolved_root = fs::canonicalize(root).map_err(|source| SecurityError::Unresolvable {
            name: file_label(root),
            source,
        })?;
        let resolved = fs::canonicalize(path).map_err(|source| SecurityError::Unresolvable {
            name: name.clone(),
            source,
        })?;

        if resolved.starts_with(&resolved_root) {
            debug!("Already archived, skipping: {}", name);
            return Err(SecurityError::InsideArchiveRoot { name });
        }
        Ok(())
    }

    /// Whether a resolved path lies inside a protected directory
    pub fn is_blocked(&self, resolved: &Path) -> bool {
        let candidate = lowercase_path(resolved);
        self.blocked_roots.iter().any(|root| {
            let root = fs::canonicalize(root).unwrap_or_else(|_| root.clone());
            candidate.starts_with(lowercase_path(&root))
        })
    }
}

impl Default for SecurityGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Protected directories for the current platform
pub fn default_blocked_roots() -> Vec<PathBuf> {
    if cfg!(windows) {
        [
            ("SYSTEMROOT", "C:\\Windows"),
            ("PROGRAMFILES", "C:\\Program Files"),
            ("PROGRAMFILES(X86)", "C:\\Program Files (x86)"),
        ]
        .iter()
        .map(|(var, default)| {
            std::env::var_os(var)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        })
        .collect()
    } else {
        [
            "/bin", "/boot", "/dev", "/etc", "/lib", "/proc", "/sbin", "/sys", "/usr",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

/// Fail when the volume holding `root` has less than `required` bytes free.
///
/// A volume that cannot be identified is not treated as full.
pub fn ensure_free_space(root: &Path, required: u64) -> Result<(), SecurityError> {
    check_capacity(file_label(root), required, available_space(root))
}

/// Free bytes on the volume whose mount point is the longest prefix of `path`
pub fn available_space(path: &Path) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

fn check_capacity(name: String, required: u64, available: Option<u64>) -> Result<(), SecurityError> {
    match available {
        Some(available) if available < required => {
            warn!(
                "Insufficient space for {}: need {} bytes, have {}",
                name, required, available
            );
            Err(SecurityError::InsufficientSpace {
                name,
                required,
                available,
            })
        }
        Some(_) => Ok(()),
        None => {
            warn!("Free space unknown for {}; continuing", name);
            Ok(())
        }
    }
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

fn is_shortcut(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("lnk"))
        .unwrap_or(false)
}

#[cfg(windows)]
fn is_reparse_point(meta: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
    meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
}

#[cfg(not(windows))]
fn is_reparse_point(_meta: &fs::Metadata) -> bool {
    false
}

fn lowercase_path(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(WRITE_PROBE_NAME);
    fs::write(&probe, b"probe")?;
    fs::remove_file(&probe)
}

/// Resolve `path` through its deepest existing ancestor directory.
///
/// The leaf is always appended as-is. Returns `None` when an unresolved
/// component is `..` or a root/prefix.
fn resolve_lenient(path: &Path) -> Option<PathBuf> {
    let mut tail = vec![path.file_name()?.to_os_string()];
    let mut existing = parent_or_current(path)?;

    while !fs::metadata(existing).map(|m| m.is_dir()).unwrap_or(false) {
        tail.push(existing.file_name()?.to_os_string());
        existing = parent_or_current(existing)?;
    }

    let mut resolved = fs::canonicalize(existing).ok()?;
    for part in tail.iter().rev() {
        let component = Path::new(part);
        if component
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        resolved.push(component);
    }
    Some(resolved)
}

fn parent_or_current(path: &Path) -> Option<&Path> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(Path::new("."))
    } else {
        Some(parent)
    }
}
