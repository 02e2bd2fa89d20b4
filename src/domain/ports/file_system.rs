//! FileSystem port - abstraction over file I/O operations
//!
//! Repositories perform every disk access through this trait so that errors
//! always carry the failed operation and the path involved.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::PapError;

/// Result type for file system operations
pub type FsResult<T> = Result<T, FsError>;

/// File system operation error
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} '{}': {source}", path.display())]
pub struct FsError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FsError {
    pub fn new(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            source,
        }
    }

    /// Depth guard tripped while copying or deleting a tree
    pub fn too_deep(op: &'static str, path: impl Into<PathBuf>, max_depth: usize) -> Self {
        Self::new(
            op,
            path,
            std::io::Error::other(format!("directory tree deeper than {max_depth} levels")),
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}

impl From<FsError> for PapError {
    fn from(err: FsError) -> Self {
        PapError::Storage {
            op: err.op,
            path: err.path,
            source: err.source,
        }
    }
}

/// Abstract file system interface
pub trait FileSystem {
    /// Read file content as string
    fn read(&self, path: &Path) -> FsResult<String>;

    /// Write content to file atomically (temp file in the same directory, then rename)
    fn write(&self, path: &Path, content: &str) -> FsResult<()>;

    /// Check if a file or directory exists
    fn exists(&self, path: &Path) -> bool;

    /// Remove a file; missing files are not an error
    fn remove_file(&self, path: &Path) -> FsResult<()>;

    /// Create directory and parents
    fn create_dir_all(&self, path: &Path) -> FsResult<()>;

    /// Last modification time
    fn modified(&self, path: &Path) -> FsResult<SystemTime>;

    /// Names of the direct subdirectories of `dir` (sorted)
    fn list_subdirs(&self, dir: &Path) -> FsResult<Vec<String>>;

    /// Names of the regular files in `dir` ending with `suffix` (sorted)
    fn list_files_with_suffix(&self, dir: &Path, suffix: &str) -> FsResult<Vec<String>>;

    /// Recursively copy `src` into `dst` (created), at most `max_depth` levels deep
    fn copy_dir(&self, src: &Path, dst: &Path, max_depth: usize) -> FsResult<()>;

    /// Recursively delete `dir`, refusing trees deeper than `max_depth`
    fn delete_dir(&self, dir: &Path, max_depth: usize) -> FsResult<()>;
}
