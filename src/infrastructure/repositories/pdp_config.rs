//! TOML Engine Configuration Repository
//!
//! Reads and writes `<domain>/pdp.toml`. Unlike domain properties, the file
//! is mandatory: a domain without an engine configuration cannot be loaded.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::toml_file;
use crate::domain::entities::PdpConfig;
use crate::domain::ports::FileSystem;
use crate::error::PapResult;
use crate::infrastructure::fs::LocalFs;

pub const PDP_CONFIG_FILE_NAME: &str = "pdp.toml";

#[derive(Debug, Clone, Default)]
pub struct TomlPdpConfigRepository {
    fs: LocalFs,
}

impl TomlPdpConfigRepository {
    pub fn new() -> Self {
        Self { fs: LocalFs::new() }
    }

    pub fn path(domain_dir: &Path) -> PathBuf {
        domain_dir.join(PDP_CONFIG_FILE_NAME)
    }

    pub fn load(&self, domain_dir: &Path) -> PapResult<PdpConfig> {
        toml_file::load(&self.fs, &Self::path(domain_dir))
    }

    pub fn save(&self, domain_dir: &Path, config: &PdpConfig) -> PapResult<()> {
        toml_file::save(&self.fs, &Self::path(domain_dir), config, "engine configuration")
    }

    pub fn modified(&self, domain_dir: &Path) -> PapResult<SystemTime> {
        Ok(self.fs.modified(&Self::path(domain_dir))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PolicyRef;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let err = TomlPdpConfigRepository::new().load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageIo);
        assert!(err.to_string().contains(PDP_CONFIG_FILE_NAME));
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let repo = TomlPdpConfigRepository::new();
        let mut config = PdpConfig::with_root(PolicyRef::latest("root"));
        config.strict_attribute_issuer_match = true;
        repo.save(dir.path(), &config).unwrap();
        assert_eq!(repo.load(dir.path()).unwrap(), config);
    }
}
