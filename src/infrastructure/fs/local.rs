//! Local File System Implementation
//!
//! Implements the FileSystem port for local disk operations.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use crate::domain::ports::file_system::{FileSystem, FsError, FsResult};

/// Local file system implementation
///
/// Provides atomic writes, depth-guarded tree copy/delete and directory
/// listings. Symbolic links found while walking a tree are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new LocalFs instance
    pub fn new() -> Self {
        Self
    }

    fn copy_level(&self, src: &Path, dst: &Path, depth: usize, max_depth: usize) -> FsResult<()> {
        fs::create_dir_all(dst).map_err(|e| FsError::new("create directory", dst, e))?;

        for entry in read_dir_sorted(src)? {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| FsError::new("inspect", &path, e))?;
            let target = dst.join(entry.file_name());

            if file_type.is_symlink() {
                tracing::warn!(path = %path.display(), "skipping symbolic link");
            } else if file_type.is_dir() {
                if depth + 1 > max_depth {
                    return Err(FsError::too_deep("copy", &path, max_depth));
                }
                self.copy_level(&path, &target, depth + 1, max_depth)?;
            } else {
                if depth + 1 > max_depth {
                    return Err(FsError::too_deep("copy", &path, max_depth));
                }
                fs::copy(&path, &target).map_err(|e| FsError::new("copy", &path, e))?;
            }
        }
        Ok(())
    }

    /// Fails before deleting anything if the tree is too deep
    fn check_depth(&self, dir: &Path, depth: usize, max_depth: usize) -> FsResult<()> {
        for entry in read_dir_sorted(dir)? {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| FsError::new("inspect", &path, e))?;
            if depth + 1 > max_depth {
                return Err(FsError::too_deep("delete", &path, max_depth));
            }
            if file_type.is_dir() {
                self.check_depth(&path, depth + 1, max_depth)?;
            }
        }
        Ok(())
    }
}

fn read_dir_sorted(dir: &Path) -> FsResult<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| FsError::new("list", dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FsError::new("list", dir, e))?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

impl FileSystem for LocalFs {
    fn read(&self, path: &Path) -> FsResult<String> {
        fs::read_to_string(path).map_err(|e| FsError::new("read", path, e))
    }

    fn write(&self, path: &Path, content: &str) -> FsResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| FsError::new("create directory", dir, e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| FsError::new("write", path, e))?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| FsError::new("write", path, e))?;
        temp.persist(path)
            .map_err(|e| FsError::new("write", path, e.error))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_file(&self, path: &Path) -> FsResult<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(FsError::new("delete", path, e))
            }
            _ => Ok(()),
        }
    }

    fn create_dir_all(&self, path: &Path) -> FsResult<()> {
        fs::create_dir_all(path).map_err(|e| FsError::new("create directory", path, e))
    }

    fn modified(&self, path: &Path) -> FsResult<SystemTime> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| FsError::new("stat", path, e))
    }

    fn list_subdirs(&self, dir: &Path) -> FsResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in read_dir_sorted(dir)? {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| FsError::new("inspect", &path, e))?;
            if !file_type.is_dir() {
                tracing::warn!(path = %path.display(), "ignoring non-directory entry");
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    tracing::warn!(name = ?raw, dir = %dir.display(), "ignoring non UTF-8 directory name");
                }
            }
        }
        Ok(names)
    }

    fn list_files_with_suffix(&self, dir: &Path, suffix: &str) -> FsResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in read_dir_sorted(dir)? {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| FsError::new("inspect", &path, e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.len() > suffix.len() && name.ends_with(suffix) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn copy_dir(&self, src: &Path, dst: &Path, max_depth: usize) -> FsResult<()> {
        self.copy_level(src, dst, 0, max_depth)
    }

    fn delete_dir(&self, dir: &Path, max_depth: usize) -> FsResult<()> {
        if !dir.exists() {
            return Ok(());
        }
        self.check_depth(dir, 0, max_depth)?;
        fs::remove_dir_all(dir).map_err(|e| FsError::new("delete", dir, e))
    }
}
