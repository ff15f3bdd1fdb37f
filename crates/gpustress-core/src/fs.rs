//! Filesystem utilities.
//!
//! Run artifacts are staged in a uniquely named temp file next to their
//! destination and persisted with a single rename. Readers see either the
//! previous file or the complete new one. A staged file that never gets
//! persisted is removed when it is dropped.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{CoreError, CoreResult};

const STAGING_PREFIX: &str = ".gpustress-";
const STAGING_SUFFIX: &str = ".partial";

/// Writes `bytes` to `path`, replacing any existing file in one step
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    // Same directory as the target so the rename never crosses filesystems.
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;

    persist(staged, path)
}

/// Pretty JSON with a trailing newline
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_file_atomic(path, &bytes)
}

fn persist(staged: NamedTempFile, path: &Path) -> CoreResult<()> {
    staged
        .persist(path)
        .map(|_| ())
        .map_err(|e| CoreError::IoError(e.error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staged_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with(STAGING_PREFIX))
            .collect()
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("runs").join("today");
        let path = parent.join("log.csv");

        write_file_atomic(&path, b"timestamp,fps\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "timestamp,fps\n");
        assert!(staged_files(&parent).is_empty());
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");

        write_file_atomic(&path, b"old").unwrap();
        write_file_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_failed_persist_leaves_no_staged_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let target = dir.path().join("occupied");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep.txt"), b"keep").unwrap();

        let err = write_file_atomic(&target, b"data").unwrap_err();

        assert!(matches!(err, CoreError::IoError(_)));
        assert!(target.join("keep.txt").exists());
        assert!(staged_files(dir.path()).is_empty());
    }

    #[test]
    fn test_write_json_atomic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("value.json");

        write_json_atomic(&path, &serde_json::json!({ "score": 1800 })).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"score\": 1800"));
        assert!(text.ends_with("}\n"));
    }
}
