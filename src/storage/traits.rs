//! Storage traits and error types
//!
//! This module defines the error type shared by the metadata and session
//! files, and the `JsonDocument` trait that gives both of them atomic
//! whole-file persistence.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A value persisted as one JSON file
///
/// Every save replaces the whole file. The new content is written to a
/// temporary file in the same directory, synced, and renamed over the
/// target, so readers only ever see the old or the new version.
pub trait JsonDocument: Serialize + DeserializeOwned {
    /// Reads the document at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The file does not exist
    /// * `Ok(Some(doc))` - The file was parsed
    /// * `Err(StorageError::Corrupt)` - The file exists but cannot be parsed
    fn read_from(path: &Path) -> StorageResult<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Atomically replaces the file at `path` with this document
    fn write_to(&self, path: &Path) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)
    }
}

/// Replaces the file at `path` with `contents`
///
/// Missing parent directories are created. On failure the previous content,
/// if any, is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| StorageError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

/// True when `a` and `b` name the same filesystem entry
///
/// Equal paths always match. Otherwise both are canonicalized; a path that
/// cannot be resolved (for example because it does not exist) never matches
/// a different spelling.
pub fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }

    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    impl JsonDocument for Sample {}

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let result = Sample::read_from(&dir.path().join("missing.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sample.json");
        let sample = Sample {
            name: "a".to_string(),
            count: 3,
        };

        sample.write_to(&path).unwrap();
        assert_eq!(Sample::read_from(&path).unwrap(), Some(sample));
    }

    #[test]
    fn test_write_replaces_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");

        Sample {
            name: "a much longer name than the next one".to_string(),
            count: 1,
        }
        .write_to(&path)
        .unwrap();
        Sample {
            name: "b".to_string(),
            count: 2,
        }
        .write_to(&path)
        .unwrap();

        let read = Sample::read_from(&path).unwrap().unwrap();
        assert_eq!(read.name, "b");
        assert_eq!(read.count, 2);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");
        Sample {
            name: "a".to_string(),
            count: 1,
        }
        .write_to(&path)
        .unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("page.md");

        write_atomic(&path, b"# Page\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Page\n");
    }

    #[test]
    fn test_same_location_resolves_dot_dot() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let direct = dir.path().join("page.md");
        let roundabout = dir.path().join("sub").join("..").join("page.md");
        fs::write(&direct, "# Page\n").unwrap();

        assert!(same_location(&direct, &roundabout));
        assert!(same_location(&roundabout, &roundabout));
        assert!(!same_location(&direct, &dir.path().join("other.md")));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");
        fs::write(&path, "{ not json").unwrap();

        let result = Sample::read_from(&path);
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }
}
