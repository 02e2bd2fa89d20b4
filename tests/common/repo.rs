//! Isolated repository for integration tests.
//!
//! `TestRepo` owns a temporary domains root, a temporary domain template
//! and a registry opened over them. The registry is closed on drop.

use std::path::PathBuf;
use std::sync::Arc;

use pap_flatfile::domain::entities::WritableDomainProperties;
use pap_flatfile::{DomainHandle, DomainRegistry, RegistrySettings, StaticRefEngineBuilder};
use tempfile::TempDir;

use super::fixtures::write_template;

pub struct TestRepo {
    pub root: TempDir,
    pub template: TempDir,
    pub registry: DomainRegistry,
}

impl TestRepo {
    pub fn new() -> Self {
        Self::with_settings(|settings| settings)
    }

    /// Open the registry with adjusted settings
    pub fn with_settings(adjust: impl FnOnce(RegistrySettings) -> RegistrySettings) -> Self {
        let root = tempfile::tempdir().unwrap();
        let template = tempfile::tempdir().unwrap();
        write_template(template.path());

        let settings = adjust(RegistrySettings::new(root.path(), template.path()));
        let registry = DomainRegistry::open(settings, Arc::new(StaticRefEngineBuilder::new()))
            .expect("failed to open registry");
        Self {
            root,
            template,
            registry,
        }
    }

    /// Open another registry over the same directories
    pub fn open_again(
        &self,
        adjust: impl FnOnce(RegistrySettings) -> RegistrySettings,
    ) -> DomainRegistry {
        let settings = adjust(RegistrySettings::new(
            self.root.path(),
            self.template.path(),
        ));
        DomainRegistry::open(settings, Arc::new(StaticRefEngineBuilder::new()))
            .expect("failed to reopen registry")
    }

    pub fn create_domain(&self) -> Arc<DomainHandle> {
        self.create_domain_with(None, None)
    }

    pub fn create_domain_with(
        &self,
        description: Option<&str>,
        external_id: Option<&str>,
    ) -> Arc<DomainHandle> {
        let id = self
            .registry
            .create_domain(WritableDomainProperties::new(description, external_id))
            .expect("failed to create domain");
        self.registry
            .get(&id)
            .expect("failed to get domain")
            .expect("created domain not found")
    }

    pub fn domain_dir(&self, domain_id: &str) -> PathBuf {
        self.root.path().join(domain_id)
    }
}

impl Drop for TestRepo {
    fn drop(&mut self) {
        self.registry.close();
    }
}
