//! Ephemeral directories and files under a job's temp root
//!
//! Resources outlive the allocator: nothing here deletes what it creates. Cleanup of
//! `<data_root>/tmp` happens outside this crate.

use super::error::ResolveError;
use std::path::PathBuf;
use tracing::debug;

const PREFIX: &str = "stagehand-";

/// Hands out uniquely named resources under a single root
#[derive(Debug, Clone)]
pub struct TempAllocator {
    root: PathBuf,
}

impl TempAllocator {
    /// The root is created lazily on first allocation
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a new empty directory and return its path
    pub fn allocate_dir(&self) -> Result<PathBuf, ResolveError> {
        self.ensure_root("directory")?;
        let path = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(&self.root)
            .map_err(|source| self.failure("directory", source))?
            .keep();
        debug!("Allocated temporary directory {}", path.display());
        Ok(path)
    }

    /// Create a new empty file and return its path
    pub fn allocate_file(&self) -> Result<PathBuf, ResolveError> {
        self.ensure_root("file")?;
        let path = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempfile_in(&self.root)
            .map_err(|source| self.failure("file", source))?
            .into_temp_path()
            .keep()
            .map_err(|e| self.failure("file", e.error))?;
        debug!("Allocated temporary file {}", path.display());
        Ok(path)
    }

    fn ensure_root(&self, kind: &'static str) -> Result<(), ResolveError> {
        std::fs::create_dir_all(&self.root).map_err(|source| self.failure(kind, source))
    }

    fn failure(&self, kind: &'static str, source: std::io::Error) -> ResolveError {
        ResolveError::TempAllocation {
            kind,
            root: self.root.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_root_created_lazily() {
        let data_root = TempDir::new().unwrap();
        let root = data_root.path().join("tmp");
        let allocator = TempAllocator::new(&root);
        assert!(!root.exists());

        let dir = allocator.allocate_dir().unwrap();
        assert!(root.is_dir());
        assert!(dir.is_dir());
        assert_eq!(dir.parent(), Some(root.as_path()));
    }

    #[test]
    fn test_each_allocation_is_distinct() {
        let data_root = TempDir::new().unwrap();
        let allocator = TempAllocator::new(data_root.path().join("tmp"));

        let first = allocator.allocate_dir().unwrap();
        let second = allocator.allocate_dir().unwrap();
        assert_ne!(first, second);

        let file_a = allocator.allocate_file().unwrap();
        let file_b = allocator.allocate_file().unwrap();
        assert_ne!(file_a, file_b);
        assert!(file_a.is_file());
        assert_eq!(std::fs::metadata(&file_a).unwrap().len(), 0);
    }

    #[test]
    fn test_resources_survive_allocator() {
        let data_root = TempDir::new().unwrap();
        let path = {
            let allocator = TempAllocator::new(data_root.path().join("tmp"));
            allocator.allocate_file().unwrap()
        };
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_root_reports_allocation_error() {
        let data_root = TempDir::new().unwrap();
        let blocker = data_root.path().join("tmp");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = TempAllocator::new(&blocker).allocate_dir().unwrap_err();
        assert!(matches!(err, ResolveError::TempAllocation { kind: "directory", .. }));
    }
}
