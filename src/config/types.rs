//! Configuration type definitions

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::loader::{self, ConfigWarning};
use crate::application::registry::{RegistrySettings, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::error::{PapError, PapResult};

/// Where domains live on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains_root: Option<PathBuf>,

    /// Directory copied into every new domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_template: Option<PathBuf>,
}

/// Background reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between two reconciliations of a domain; `<= 0` disables them
    #[serde(default)]
    pub interval_secs: i64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT.as_secs()
}

impl SyncConfig {
    pub fn interval(&self) -> Option<Duration> {
        u64::try_from(self.interval_secs)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

/// Deployment mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Serve engines only; every administrative operation is disabled
    #[serde(default)]
    pub pdp_only: bool,

    /// List the default JSON request preprocessor among enabled features
    #[serde(default)]
    pub enable_json_profile: bool,
}

/// Repository configuration file (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub service: ServiceConfig,
}

impl RepositoryConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> PapResult<Self> {
        let (config, _warnings) = loader::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys)
    pub fn load_with_warnings(path: &Path) -> PapResult<(Self, Vec<ConfigWarning>)> {
        loader::load_with_warnings(path)
    }

    /// Load from an explicit file, the user config file, or defaults
    ///
    /// Environment overrides are applied in every case.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        loader::load_or_default(explicit)
    }

    /// Apply `PAP_*` environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        loader::with_env_overrides(self, |name| std::env::var(name).ok())
    }

    /// Validated settings for [`crate::application::DomainRegistry::open`]
    pub fn settings(&self) -> PapResult<RegistrySettings> {
        let domains_root = self
            .storage
            .domains_root
            .clone()
            .ok_or_else(|| PapError::invalid("storage.domains_root is not set"))?;
        let domain_template = self
            .storage
            .domain_template
            .clone()
            .ok_or_else(|| PapError::invalid("storage.domain_template is not set"))?;
        if domains_root == domain_template {
            return Err(PapError::invalid(format!(
                "storage.domain_template must differ from storage.domains_root ('{}')",
                domains_root.display()
            )));
        }
        if self.sync.shutdown_timeout_secs == 0 {
            return Err(PapError::invalid("sync.shutdown_timeout_secs must be positive"));
        }

        let mut settings = RegistrySettings::new(domains_root, domain_template)
            .with_sync_interval(self.sync.interval())
            .with_pdp_only(self.service.pdp_only)
            .with_json_profile(self.service.enable_json_profile);
        settings.shutdown_timeout = Duration::from_secs(self.sync.shutdown_timeout_secs);
        Ok(settings)
    }
}
