// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Artifact layout and atomic file handling
//!
//! Every artifact is written to a temporary file in its destination
//! directory and renamed into place, so a reader sees either the previous
//! complete file or the new complete file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::{OrderflowError, OrderflowResult};

/// Snapshot of the Order relation
pub const SNAPSHOT_FILE: &str = "orders.csv";
/// Aggregate result
pub const COUNT_FILE: &str = "count.txt";
/// Encoded final artifact
pub const FINAL_FILE: &str = "final_output.txt";

/// Fixed file layout under one output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn count(&self) -> PathBuf {
        self.dir.join(COUNT_FILE)
    }

    pub fn final_output(&self) -> PathBuf {
        self.dir.join(FINAL_FILE)
    }

    /// Create the output directory; a no-op when it already exists
    pub fn ensure_dir(&self) -> OrderflowResult<()> {
        if !self.dir.is_dir() {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| OrderflowError::write_error(&self.dir, e))?;
            tracing::info!(dir = %self.dir.display(), "created output directory");
        }
        Ok(())
    }
}

/// Replace `path` with `contents` via temp file + rename
pub fn write_atomic(path: &Path, contents: &[u8]) -> OrderflowResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp =
        NamedTempFile::new_in(parent).map_err(|e| OrderflowError::write_error(path, e))?;
    tmp.write_all(contents)
        .map_err(|e| OrderflowError::write_error(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| OrderflowError::write_error(path, e))?;
    tmp.persist(path)
        .map_err(|e| OrderflowError::write_error(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(())
}

/// Read an upstream artifact; absent or empty files are `InputMissing`
pub fn read_input(path: &Path, producer: &str) -> OrderflowResult<Vec<u8>> {
    if !path.is_file() {
        return Err(OrderflowError::input_missing(path, producer));
    }

    let contents = std::fs::read(path)?;
    if contents.iter().all(u8::is_ascii_whitespace) {
        return Err(OrderflowError::input_missing(path, producer));
    }

    Ok(contents)
}

/// BLAKE3 hex digest of an artifact
pub fn digest(path: &Path) -> OrderflowResult<String> {
    let contents = std::fs::read(path)?;
    Ok(blake3::hash(&contents).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = ArtifactLayout::new("/srv/out");
        assert_eq!(layout.snapshot(), PathBuf::from("/srv/out/orders.csv"));
        assert_eq!(layout.count(), PathBuf::from("/srv/out/count.txt"));
        assert_eq!(layout.final_output(), PathBuf::from("/srv/out/final_output.txt"));
    }

    #[test]
    fn test_ensure_dir_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path().join("a").join("b"));

        layout.ensure_dir().unwrap();
        layout.ensure_dir().unwrap();
        assert!(layout.dir().is_dir());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("count.txt");

        write_atomic(&path, b"100").unwrap();
        write_atomic(&path, b"8").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "8");
        // Only the artifact remains, no stray temp files
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("count.txt");

        let err = write_atomic(&path, b"8").unwrap_err();
        assert!(matches!(err, OrderflowError::WriteError { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_input_missing_or_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("count.txt");

        let err = read_input(&path, "aggregate").unwrap_err();
        assert!(matches!(err, OrderflowError::InputMissing { .. }));

        std::fs::write(&path, "\n").unwrap();
        let err = read_input(&path, "aggregate").unwrap_err();
        assert!(matches!(err, OrderflowError::InputMissing { .. }));

        std::fs::write(&path, "8").unwrap();
        assert_eq!(read_input(&path, "aggregate").unwrap(), b"8");
    }

    #[test]
    fn test_digest_stable() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        std::fs::write(&a, "same").unwrap();
        std::fs::write(&b, "same").unwrap();

        assert_eq!(digest(&a).unwrap(), digest(&b).unwrap());
        assert_eq!(digest(&a).unwrap().len(), 64);
    }
}
