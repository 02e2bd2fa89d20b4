//! Shared TOML load/save helpers for per-domain files

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::domain::ports::FileSystem;
use crate::error::{PapError, PapResult};
use crate::infrastructure::fs::LocalFs;

pub(super) fn load<T: DeserializeOwned>(fs: &LocalFs, path: &Path) -> PapResult<T> {
    let content = fs.read(path)?;
    toml::from_str(&content).map_err(|e| PapError::Corrupted {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub(super) fn save<T: Serialize>(
    fs: &LocalFs,
    path: &Path,
    value: &T,
    what: &'static str,
) -> PapResult<()> {
    let content = toml::to_string_pretty(value).map_err(|e| PapError::Serialization {
        what,
        message: e.to_string(),
    })?;
    fs.write(path, &content)?;
    Ok(())
}
