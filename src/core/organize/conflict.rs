//! Name-conflict resolution against files already in the archive.
//!
//! Sizes are compared before contents, and a duplicate is only ever
//! declared after an exact byte comparison. A digest match alone is never
//! enough, since the source is deleted on the strength of this decision.

use crate::config::ArchiveConfig;
use crate::core::identity::HASH_BUFFER_SIZE;
use crate::error::{file_label, ConflictError};
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where an incoming file should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Free path to copy to, or the existing identical file
    pub path: PathBuf,
    /// `path` already holds byte-identical content
    pub is_duplicate: bool,
}

impl Resolution {
    fn free(path: PathBuf) -> Self {
        Self {
            path,
            is_duplicate: false,
        }
    }

    fn duplicate(path: PathBuf) -> Self {
        Self {
            path,
            is_duplicate: true,
        }
    }
}

/// Picks a free `stem_N.ext` name or detects an identical existing file
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    warning_threshold: usize,
    limit: usize,
}

impl ConflictResolver {
    pub fn new(warning_threshold: usize, limit: usize) -> Self {
        Self {
            warning_threshold,
            limit,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.conflict_warning_threshold, config.conflict_limit)
    }

    /// Resolve `target` for the file at `source`.
    pub fn resolve(&self, source: &Path, target: &Path) -> Result<Resolution, ConflictError> {
        if !exists_no_follow(target) {
            return Ok(Resolution::free(target.to_path_buf()));
        }
        if files_identical(source, target) {
            debug!("Identical file already archived: {}", file_label(target));
            return Ok(Resolution::duplicate(target.to_path_buf()));
        }

        let parent = target.parent().unwrap_or_else(|| Path::new(""));
        let stem = target.file_stem().map(OsString::from).unwrap_or_default();
        let extension = target.extension().map(OsString::from);

        for counter in 1..=self.limit {
            if counter == self.warning_threshold {
                warn!(
                    "High conflict count ({}) for: {}",
                    counter,
                    file_label(target)
                );
            }

            let candidate = parent.join(numbered_name(&stem, extension.as_deref(), counter));
            if !exists_no_follow(&candidate) {
                return Ok(Resolution::free(candidate));
            }
            if files_identical(source, &candidate) {
                debug!("Identical file already archived: {}", file_label(&candidate));
                return Ok(Resolution::duplicate(candidate));
            }
        }

        warn!("Conflict limit exceeded for: {}", file_label(target));
        Err(ConflictError::LimitExceeded {
            name: file_label(target),
            limit: self.limit,
        })
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::from_config(&ArchiveConfig::default())
    }
}

/// `stem_N.ext`, or `stem_N` without an extension
fn numbered_name(stem: &OsStr, extension: Option<&OsStr>, n: usize) -> OsString {
    let mut name = stem.to_os_string();
    name.push(format!("_{}", n));
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Link-aware existence test; a dangling symlink still occupies the name
fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Exact content comparison. Any read error counts as "different".
pub fn files_identical(a: &Path, b: &Path) -> bool {
    match compare_contents(a, b) {
        Ok(same) => same,
        Err(e) => {
            warn!(
                "Comparison failed for {} / {}: {}",
                file_label(a),
                file_label(b),
                e
            );
            false
        }
    }
}

fn compare_contents(a: &Path, b: &Path) -> io::Result<bool> {
    let meta_b = fs::symlink_metadata(b)?;
    if !meta_b.is_file() {
        return Ok(false);
    }
    if fs::metadata(a)?.len() != meta_b.len() {
        return Ok(false);
    }

    let mut file_a = File::open(a)?;
    let mut file_b = File::open(b)?;
    let mut buf_a = vec![0u8; HASH_BUFFER_SIZE];
    let mut buf_b = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let read_a = fill(&mut file_a, &mut buf_a)?;
        let read_b = fill(&mut file_b, &mut buf_b)?;
        if read_a != read_b || buf_a[..read_a] != buf_b[..read_b] {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or EOF
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let src_dir = temp.path().join("src");
        let dest_dir = temp.path().join("dest");
        fs::create_dir_all(&src_dir).unwrap();
        fs::create_dir_all(&dest_dir).unwrap();
        (temp, src_dir, dest_dir)
    }

    #[test]
    fn free_target_is_accepted_unchanged() {
        let (_temp, src, dest) = setup();
        let source = src.join("a.jpg");
        fs::write(&source, b"one").unwrap();

        let resolution = ConflictResolver::default()
            .resolve(&source, &dest.join("a.jpg"))
            .unwrap();
        assert_eq!(resolution, Resolution::free(dest.join("a.jpg")));
    }

    #[test]
    fn identical_target_is_a_duplicate() {
        let (_temp, src, dest) = setup();
        let source = src.join("a.jpg");
        fs::write(&source, b"same bytes").unwrap();
        fs::write(dest.join("a.jpg"), b"same bytes").unwrap();

        let resolution = ConflictResolver::default()
            .resolve(&source, &dest.join("a.jpg"))
            .unwrap();
        assert!(resolution.is_duplicate);
        assert_eq!(resolution.path, dest.join("a.jpg"));
    }

    #[test]
    fn different_content_gets_a_numbered_name() {
        let (_temp, src, dest) = setup();
        let source = src.join("a.jpg");
        fs::write(&source, b"new!").unwrap();
        fs::write(dest.join("a.jpg"), b"old!").unwrap();
        fs::write(dest.join("a_1.jpg"), b"older").unwrap();

        let resolution = ConflictResolver::default()
            .resolve(&source, &dest.join("a.jpg"))
            .unwrap();
        assert_eq!(resolution, Resolution::free(dest.join("a_2.jpg")));
    }

    #[test]
    fn identical_numbered_candidate_is_a_duplicate() {
        let (_temp, src, dest) = setup();
        let source = src.join("a.jpg");
        fs::write(&source, b"payload").unwrap();
        fs::write(dest.join("a.jpg"), b"other").unwrap();
        fs::write(dest.join("a_1.jpg"), b"payload").unwrap();

        let resolution = ConflictResolver::default()
            .resolve(&source, &dest.join("a.jpg"))
            .unwrap();
        assert_eq!(resolution, Resolution::duplicate(dest.join("a_1.jpg")));
    }

    #[test]
    fn names_without_extension_are_numbered() {
        let (_temp, src, dest) = setup();
        let source = src.join("README");
        fs::write(&source, b"x").unwrap();
        fs::write(dest.join("README"), b"y").unwrap();

        let resolution = ConflictResolver::default()
            .resolve(&source, &dest.join("README"))
            .unwrap();
        assert_eq!(resolution.path, dest.join("README_1"));
    }

    #[test]
    fn limit_is_enforced() {
        let (_temp, src, dest) = setup();
        let source = src.join("a.jpg");
        fs::write(&source, b"zz").unwrap();
        fs::write(dest.join("a.jpg"), b"a0").unwrap();
        for n in 1..=3 {
            fs::write(dest.join(format!("a_{}.jpg", n)), format!("a{}", n)).unwrap();
        }

        let result = ConflictResolver::new(2, 3).resolve(&source, &dest.join("a.jpg"));
        assert!(matches!(
            result,
            Err(ConflictError::LimitExceeded { limit: 3, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_occupies_its_name() {
        let (_temp, src, dest) = setup();
        let source = src.join("a.jpg");
        fs::write(&source, b"data").unwrap();
        std::os::unix::fs::symlink(dest.join("missing"), dest.join("a.jpg")).unwrap();

        let resolution = ConflictResolver::default()
            .resolve(&source, &dest.join("a.jpg"))
            .unwrap();
        assert_eq!(resolution, Resolution::free(dest.join("a_1.jpg")));
    }

    #[test]
    fn large_identical_files_compare_across_chunks() {
        let (_temp, src, dest) = setup();
        let data: Vec<u8> = (0..HASH_BUFFER_SIZE * 2 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(src.join("big.bin"), &data).unwrap();
        fs::write(dest.join("big.bin"), &data).unwrap();
        assert!(files_identical(&src.join("big.bin"), &dest.join("big.bin")));

        let mut changed = data.clone();
        let last = changed.len() - 1;
        changed[last] ^= 0xff;
        fs::write(dest.join("big.bin"), &changed).unwrap();
        assert!(!files_identical(&src.join("big.bin"), &dest.join("big.bin")));
    }
}
