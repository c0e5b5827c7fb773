//! Spill directory
//!
//! Allocates uniquely named spill files under one directory and cleans up
//! files left behind by sets that were dropped while persisted.
//!
//! File names: `<prefix>-<uuid v4>.spill`

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::config::SpillConfig;
use super::file::LocalFileHandler;
use crate::observability::Logger;
use crate::sortedset::HandlerResult;

/// Spill file extension
pub const SPILL_EXTENSION: &str = "spill";

/// A directory that spill files are allocated in.
#[derive(Debug, Clone)]
pub struct SpillDirectory {
    root: PathBuf,
    prefix: String,
    write_buffer: usize,
    sync_on_close: bool,
}

impl SpillDirectory {
    /// Open the configured directory, creating it if missing.
    pub fn open(config: &SpillConfig) -> HandlerResult<Self> {
        let root = config.spill_path();
        fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            prefix: config.file_prefix.clone(),
            write_buffer: config.write_buffer_bytes,
            sync_on_close: config.sync_on_close,
        })
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Allocate a handler for a new, not yet written spill file.
    pub fn allocate<E>(&self) -> LocalFileHandler<E> {
        let name = format!("{}-{}.{}", self.prefix, Uuid::new_v4(), SPILL_EXTENSION);
        self.handler_for(self.root.join(name))
    }

    /// Handler for an existing spill file, configured like allocated ones.
    pub fn handler_for<E>(&self, path: impl Into<PathBuf>) -> LocalFileHandler<E> {
        LocalFileHandler::new(path)
            .with_write_buffer(self.write_buffer)
            .with_sync_on_close(self.sync_on_close)
    }

    /// List spill files carrying this directory's prefix, sorted by path.
    pub fn list(&self) -> HandlerResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if self.is_own_spill_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Delete every spill file carrying this directory's prefix.
    ///
    /// Only call this when no set allocated here is still persisted.
    /// Returns the number of files removed.
    pub fn sweep(&self) -> HandlerResult<usize> {
        let files = self.list()?;
        let mut removed = 0;
        for path in files {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let removed_str = removed.to_string();
        let dir = self.root.display().to_string();
        Logger::info(
            "SPILL_DIRECTORY_SWEPT",
            &[("dir", dir.as_str()), ("removed", removed_str.as_str())],
        );
        Ok(removed)
    }

    fn is_own_spill_file(&self, path: &Path) -> bool {
        let has_extension = path.extension().and_then(|e| e.to_str()) == Some(SPILL_EXTENSION);
        let has_prefix = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with(&format!("{}-", self.prefix)));
        path.is_file() && has_extension && has_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn directory(temp: &TempDir) -> SpillDirectory {
        let mut config = SpillConfig::new(temp.path().join("spill"));
        config.file_prefix = "q7".into();
        config.sync_on_close = false;
        SpillDirectory::open(&config).unwrap()
    }

    #[test]
    fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = directory(&temp);
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_allocated_names_are_unique() {
        let temp = TempDir::new().unwrap();
        let dir = directory(&temp);

        let a: LocalFileHandler<u32> = dir.allocate();
        let b: LocalFileHandler<u32> = dir.allocate();
        assert_ne!(a.path(), b.path());

        let name = a.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("q7-"));
        assert!(name.ends_with(".spill"));
        assert!(!a.exists());
    }

    #[test]
    fn test_sweep_only_removes_own_files() {
        let temp = TempDir::new().unwrap();
        let dir = directory(&temp);

        let a: LocalFileHandler<u32> = dir.allocate();
        let b: LocalFileHandler<u32> = dir.allocate();
        fs::write(a.path(), b"x").unwrap();
        fs::write(b.path(), b"y").unwrap();
        let foreign = dir.path().join("other-1.spill");
        let unrelated = dir.path().join("q7-notes.txt");
        fs::write(&foreign, b"z").unwrap();
        fs::write(&unrelated, b"z").unwrap();

        assert_eq!(dir.list().unwrap().len(), 2);
        assert_eq!(dir.sweep().unwrap(), 2);
        assert!(!a.exists());
        assert!(!b.exists());
        assert!(foreign.exists());
        assert!(unrelated.exists());
    }
}
