//! # Identity Module
//!
//! Computes file fingerprints.
//!
//! ## Two tiers
//! - **Quick identity** - `size_mtime_prefix8`: file size, whole-second
//!   modification time and the first 8 hex digits of an xxh3 digest over the
//!   first 4KB. Only an in-session "already added" key; never used to decide
//!   that two files are byte-identical.
//! - **Full identity** - BLAKE3 over the entire file, streamed in 64KB
//!   chunks. Used for post-copy integrity verification.
//!
//! The `try_*` functions return typed errors. The plain functions never fail:
//! they log and return `None`, which callers must treat as "cannot establish
//! identity, reject the file".

use crate::error::{file_label, HashError};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{error, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Bytes read from the start of a file for the quick identity
pub const QUICK_READ_SIZE: usize = 4096;

/// Chunk size used when streaming a whole file
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

const PREFIX_DIGEST_LEN: usize = 8;

/// Compute the quick identity token, or report why it could not be computed
pub fn try_quick_identity(path: &Path) -> Result<String, HashError> {
    reject_symlink(path)?;

    let meta = fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
    let mtime = meta
        .modified()
        .map(|t| DateTime::<Utc>::from(t).timestamp())
        .map_err(|e| HashError::from_io(path, e))?;

    let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    let mut header = Vec::with_capacity(QUICK_READ_SIZE);
    file.take(QUICK_READ_SIZE as u64)
        .read_to_end(&mut header)
        .map_err(|e| HashError::from_io(path, e))?;

    let digest = format!("{:016x}", xxh3_64(&header));
    Ok(format!(
        "{}_{}_{}",
        meta.len(),
        mtime,
        &digest[..PREFIX_DIGEST_LEN]
    ))
}

/// Compute the full content digest, or report why it could not be computed
pub fn try_full_identity(path: &Path) -> Result<String, HashError> {
    reject_symlink(path)?;

    let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| HashError::from_io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Quick identity that never fails; `None` means the file must be rejected
pub fn quick_identity(path: &Path) -> Option<String> {
    try_quick_identity(path).map_err(log_hash_error).ok()
}

/// Full identity that never fails; `None` means the file must be rejected
pub fn full_identity(path: &Path) -> Option<String> {
    try_full_identity(path).map_err(log_hash_error).ok()
}

fn reject_symlink(path: &Path) -> Result<(), HashError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(HashError::SymlinkRejected {
            name: file_label(path),
        }),
        Ok(_) => Ok(()),
        Err(e) => Err(HashError::from_io(path, e)),
    }
}

fn log_hash_error(err: HashError) {
    match &err {
        HashError::PermissionDenied { .. } | HashError::NotFound { .. } => error!("{}", err),
        HashError::SymlinkRejected { .. } | HashError::Io { .. } => {
            warn!("Hash calculation failed: {}", err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn quick_identity_has_three_parts() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.jpg", b"hello world");
        let token = quick_identity(&path).unwrap();

        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "11");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), PREFIX_DIGEST_LEN);
    }

    #[test]
    fn quick_identity_only_reads_the_prefix() {
        let temp = TempDir::new().unwrap();
        let mut first = vec![7u8; QUICK_READ_SIZE * 2];
        let mut second = first.clone();
        first[QUICK_READ_SIZE + 10] = 1;
        second[QUICK_READ_SIZE + 10] = 2;

        let a = write(&temp, "a.jpg", &first);
        let b = write(&temp, "b.jpg", &second);
        let mtime = fs::metadata(&a).unwrap().modified().unwrap();
        File::options()
            .write(true)
            .open(&b)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let quick_a = quick_identity(&a).unwrap();
        let quick_b = quick_identity(&b).unwrap();
        assert_eq!(quick_a, quick_b);

        // The strong identity still tells them apart
        assert_ne!(full_identity(&a).unwrap(), full_identity(&b).unwrap());
    }

    #[test]
    fn quick_identity_differs_on_prefix_change() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.jpg", b"aaaa");
        let b = write(&temp, "b.jpg", b"bbbb");
        let a_digest = quick_identity(&a).unwrap();
        let b_digest = quick_identity(&b).unwrap();
        assert_ne!(
            a_digest.rsplit('_').next().unwrap(),
            b_digest.rsplit('_').next().unwrap()
        );
    }

    #[test]
    fn full_identity_is_stable() {
        let temp = TempDir::new().unwrap();
        let data: Vec<u8> = (0..HASH_BUFFER_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let path = write(&temp, "big.mov", &data);

        let first = full_identity(&path).unwrap();
        let second = full_identity(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, blake3::hash(&data).to_hex().to_string());
    }

    #[test]
    fn missing_file_yields_sentinel() {
        let path = PathBuf::from("/nonexistent/photo.jpg");
        assert!(quick_identity(&path).is_none());
        assert!(full_identity(&path).is_none());
        assert!(matches!(
            try_full_identity(&path),
            Err(HashError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_hashed() {
        let temp = TempDir::new().unwrap();
        let real = write(&temp, "real.jpg", b"data");
        let link = temp.path().join("link.jpg");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(matches!(
            try_quick_identity(&link),
            Err(HashError::SymlinkRejected { .. })
        ));
        assert!(full_identity(&link).is_none());
    }
}
