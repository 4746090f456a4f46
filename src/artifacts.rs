//! Sequential allocation of output artifact paths.
//!
//! Each (directory, extension) pair gets its own monotone counter. Indices
//! are 6-digit zero-padded decimals starting at `000000`, seeded by a
//! one-time directory scan when the allocator is opened and advanced in
//! memory afterwards. Counters for different directories, and for different
//! extensions within one directory, are independent.
//!
//! Two allocators opened on the same directory do not see each other's
//! state; callers must keep one allocator per directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Allocates sequential output paths within one directory for one extension.
pub struct PathAllocator {
    dir: PathBuf,
    extension: String,
    next_index: u32,
}

impl PathAllocator {
    /// Opens an allocator for the given directory and extension.
    ///
    /// Creates the directory if absent, then seeds the counter from the
    /// files already present: one past the number parsed from the newest
    /// matching file, or 0 for an empty directory.
    pub fn open(dir: impl Into<PathBuf>, extension: &str) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let next_index = scan_next_index(&dir, extension)?;
        Ok(Self {
            dir,
            extension: extension.to_string(),
            next_index,
        })
    }

    /// Returns the next path and advances the counter.
    ///
    /// The path is not created; the caller is expected to write to it
    /// promptly. Indices never repeat within one allocator.
    pub fn allocate(&mut self) -> PathBuf {
        let path = self
            .dir
            .join(format!("{:06}.{}", self.next_index, self.extension));
        self.next_index += 1;
        path
    }

    /// The directory this allocator writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Scans a directory for the next free index.
///
/// "Newest" is keyed on file creation time (modification time where the
/// platform reports no creation time), not on filename order: a copied or
/// renamed file carrying a high number but an old timestamp can therefore
/// seed a colliding index. Legacy behavior, kept on purpose; see DESIGN.md.
/// Files whose stem is not a decimal number are ignored.
fn scan_next_index(dir: &Path, extension: &str) -> io::Result<u32> {
    let mut newest: Option<(SystemTime, u32)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(number) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            debug!(path = %path.display(), "ignoring artifact with non-numeric stem");
            continue;
        };
        let meta = entry.metadata()?;
        let stamp = meta.created().or_else(|_| meta.modified())?;
        if newest.is_none_or(|(t, _)| stamp >= t) {
            newest = Some((stamp, number));
        }
    }

    Ok(match newest {
        Some((_, number)) => number + 1,
        None => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_directory_starts_at_zero() {
        let dir = tempdir().unwrap();
        let mut alloc = PathAllocator::open(dir.path(), "png").unwrap();
        let path = alloc.allocate();
        assert_eq!(path, dir.path().join("000000.png"));
    }

    #[test]
    fn test_indices_are_monotone_within_one_allocator() {
        let dir = tempdir().unwrap();
        let mut alloc = PathAllocator::open(dir.path(), "txt").unwrap();
        assert_eq!(alloc.allocate(), dir.path().join("000000.txt"));
        assert_eq!(alloc.allocate(), dir.path().join("000001.txt"));
        assert_eq!(alloc.allocate(), dir.path().join("000002.txt"));
    }

    #[test]
    fn test_reopen_continues_after_existing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("000000.png"), b"x").unwrap();
        let mut alloc = PathAllocator::open(dir.path(), "png").unwrap();
        assert_eq!(alloc.allocate(), dir.path().join("000001.png"));
    }

    #[test]
    fn test_seed_comes_from_newest_file_number() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("000005.png"), b"x").unwrap();
        let mut alloc = PathAllocator::open(dir.path(), "png").unwrap();
        assert_eq!(alloc.allocate(), dir.path().join("000006.png"));
    }

    #[test]
    fn test_extensions_have_independent_counters() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("000003.png"), b"x").unwrap();
        let mut txt = PathAllocator::open(dir.path(), "txt").unwrap();
        let mut png = PathAllocator::open(dir.path(), "png").unwrap();
        assert_eq!(txt.allocate(), dir.path().join("000000.txt"));
        assert_eq!(png.allocate(), dir.path().join("000004.png"));
    }

    #[test]
    fn test_non_numeric_stems_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let mut alloc = PathAllocator::open(dir.path(), "txt").unwrap();
        assert_eq!(alloc.allocate(), dir.path().join("000000.txt"));
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("caption");
        let mut alloc = PathAllocator::open(&nested, "txt").unwrap();
        assert!(nested.is_dir());
        assert_eq!(alloc.allocate(), nested.join("000000.txt"));
    }
}
