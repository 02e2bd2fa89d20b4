//! TOML Domain Properties Repository
//!
//! Reads and writes `<domain>/properties.toml`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::toml_file;
use crate::domain::entities::DomainProperties;
use crate::domain::ports::FileSystem;
use crate::error::PapResult;
use crate::infrastructure::fs::LocalFs;

pub const PROPERTIES_FILE_NAME: &str = "properties.toml";

#[derive(Debug, Clone, Default)]
pub struct TomlPropertiesRepository {
    fs: LocalFs,
}

impl TomlPropertiesRepository {
    pub fn new() -> Self {
        Self { fs: LocalFs::new() }
    }

    pub fn path(domain_dir: &Path) -> PathBuf {
        domain_dir.join(PROPERTIES_FILE_NAME)
    }

    /// Load the domain properties; a missing file yields defaults
    pub fn load(&self, domain_dir: &Path) -> PapResult<DomainProperties> {
        let path = Self::path(domain_dir);
        if !self.fs.exists(&path) {
            return Ok(DomainProperties::default());
        }
        toml_file::load(&self.fs, &path)
    }

    pub fn save(&self, domain_dir: &Path, props: &DomainProperties) -> PapResult<()> {
        toml_file::save(&self.fs, &Self::path(domain_dir), props, "domain properties")
    }

    /// Modification time, `None` if the file does not exist
    pub fn modified(&self, domain_dir: &Path) -> PapResult<Option<SystemTime>> {
        let path = Self::path(domain_dir);
        match self.fs.modified(&path) {
            Ok(time) => Ok(Some(time)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
