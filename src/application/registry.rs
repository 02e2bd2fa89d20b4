//! Domain registry
//!
//! Maps domain IDs to live [`DomainHandle`]s and externalIds to domain IDs.
//! Both maps live in [`RegistryIndex`] behind the registry lock, which is
//! held only for map updates: engine builds, directory copies and domain
//! reconciliation all happen outside it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::domain::{DomainContext, DomainHandle};
use crate::domain::entities::{ReadableDomainProperties, WritableDomainProperties};
use crate::domain::ports::{EngineBuilder, FileSystem};
use crate::domain::value_objects::{generate_domain_id, is_valid_domain_dir_name};
use crate::error::{PapError, PapResult};
use crate::infrastructure::fs::LocalFs;
use crate::infrastructure::repositories::TomlPropertiesRepository;

/// Deepest entry of a domain directory: `policies/<id>/<version>.json`
pub const DOMAIN_DIR_MAX_DEPTH: usize = 3;

/// Default bound on each phase of a sync task shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated registry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub domains_root: PathBuf,
    pub domain_template: PathBuf,
    /// `None` disables background reconciliation
    pub sync_interval: Option<Duration>,
    pub shutdown_timeout: Duration,
    /// Only engine lookups are allowed, administration is disabled
    pub pdp_only: bool,
    pub enable_json_profile: bool,
}

impl RegistrySettings {
    pub fn new(domains_root: impl Into<PathBuf>, domain_template: impl Into<PathBuf>) -> Self {
        Self {
            domains_root: domains_root.into(),
            domain_template: domain_template.into(),
            sync_interval: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            pdp_only: false,
            enable_json_profile: false,
        }
    }

    pub fn with_sync_interval(mut self, interval: Option<Duration>) -> Self {
        self.sync_interval = interval.filter(|i| !i.is_zero());
        self
    }

    pub fn with_pdp_only(mut self, pdp_only: bool) -> Self {
        self.pdp_only = pdp_only;
        self
    }

    pub fn with_json_profile(mut self, enabled: bool) -> Self {
        self.enable_json_profile = enabled;
        self
    }
}

pub(crate) type SharedIndex = Arc<Mutex<RegistryIndex>>;

/// Live domains and externalId bindings
#[derive(Default)]
pub(crate) struct RegistryIndex {
    domains: HashMap<String, Arc<DomainHandle>>,
    external_ids: HashMap<String, String>,
    /// IDs of domains being created, invisible to lookups and scans
    pending: HashSet<String>,
}

impl RegistryIndex {
    fn get(&self, domain_id: &str) -> Option<Arc<DomainHandle>> {
        self.domains.get(domain_id).cloned()
    }

    fn is_taken(&self, domain_id: &str) -> bool {
        self.domains.contains_key(domain_id) || self.pending.contains(domain_id)
    }

    fn handles(&self) -> Vec<Arc<DomainHandle>> {
        self.domains.values().cloned().collect()
    }

    pub(crate) fn check_external_id_free(&self, domain_id: &str, external_id: &str) -> PapResult<()> {
        match self.external_ids.get(external_id) {
            Some(bound_to) if bound_to != domain_id => Err(PapError::ExternalIdConflict {
                external_id: external_id.to_string(),
                domain_id: domain_id.to_string(),
                bound_to: bound_to.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Move a registered domain's binding from `old` to `new`
    ///
    /// Unregistered (evicted) domains leave the index untouched.
    pub(crate) fn rebind_external_id(
        &mut self,
        domain_id: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> PapResult<()> {
        if old == new || !self.domains.contains_key(domain_id) {
            return Ok(());
        }
        if let Some(new) = new {
            self.check_external_id_free(domain_id, new)?;
        }
        if let Some(old) = old {
            if self.external_ids.get(old).is_some_and(|bound| bound == domain_id) {
                self.external_ids.remove(old);
            }
        }
        if let Some(new) = new {
            self.external_ids.insert(new.to_string(), domain_id.to_string());
        }
        Ok(())
    }

    /// Register a handle and bind its cached externalId
    fn insert(&mut self, handle: &Arc<DomainHandle>) -> PapResult<()> {
        let domain_id = handle.domain_id();
        if self.domains.contains_key(domain_id) {
            return Err(PapError::DomainIdCollision {
                domain_id: domain_id.to_string(),
            });
        }
        if let Some(external_id) = handle.external_id() {
            self.check_external_id_free(domain_id, &external_id)?;
            self.external_ids.insert(external_id, domain_id.to_string());
        }
        self.domains.insert(domain_id.to_string(), Arc::clone(handle));
        Ok(())
    }

    fn remove(&mut self, domain_id: &str) -> Option<Arc<DomainHandle>> {
        let handle = self.domains.remove(domain_id)?;
        self.external_ids.retain(|_, bound_to| bound_to != domain_id);
        Some(handle)
    }

    /// Remove `domain_id` only if it is still registered with `handle`
    pub(crate) fn remove_if_same(
        &mut self,
        domain_id: &str,
        handle: &DomainHandle,
    ) -> Option<Arc<DomainHandle>> {
        let same = self
            .domains
            .get(domain_id)
            .is_some_and(|registered| std::ptr::eq(Arc::as_ptr(registered), handle));
        if same {
            self.remove(domain_id)
        } else {
            None
        }
    }
}

/// Registry of the domains stored under one root directory
pub struct DomainRegistry {
    root: PathBuf,
    template: PathBuf,
    context: Arc<DomainContext>,
    fs: LocalFs,
    properties_repo: TomlPropertiesRepository,
    index: SharedIndex,
}

impl DomainRegistry {
    /// Open the registry, loading every domain found under the root
    ///
    /// A domain that fails to load aborts opening.
    pub fn open(settings: RegistrySettings, builder: Arc<dyn EngineBuilder>) -> PapResult<Self> {
        check_directory(&settings.domains_root, "domains root", true)?;
        check_directory(&settings.domain_template, "domain template", false)?;

        let registry = Self {
            root: settings.domains_root,
            template: settings.domain_template,
            context: Arc::new(DomainContext {
                builder,
                pdp_only: settings.pdp_only,
                enable_json_profile: settings.enable_json_profile,
                sync_interval: settings.sync_interval,
                shutdown_timeout: settings.shutdown_timeout,
            }),
            fs: LocalFs::new(),
            properties_repo: TomlPropertiesRepository::new(),
            index: SharedIndex::default(),
        };

        for domain_id in registry.scan()? {
            if let Err(e) = registry.adopt(&domain_id) {
                registry.close();
                return Err(e);
            }
        }
        tracing::info!(
            root = %registry.root.display(),
            domains = registry.index.lock().domains.len(),
            "domain registry opened"
        );
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_admin(&self, operation: &'static str) -> PapResult<()> {
        if self.context.pdp_only {
            return Err(PapError::Disabled { operation });
        }
        Ok(())
    }

    /// Create a domain from the template, returning its new ID
    pub fn create_domain(&self, props: WritableDomainProperties) -> PapResult<String> {
        self.ensure_admin("create domain")?;
        let props = props.normalized();
        let domain_id = generate_domain_id();
        let dir = self.root.join(&domain_id);

        {
            let mut index = self.index.lock();
            if index.is_taken(&domain_id) || dir.exists() {
                return Err(PapError::DomainIdCollision { domain_id });
            }
            if let Some(external_id) = &props.external_id {
                index.check_external_id_free(&domain_id, external_id)?;
            }
            index.pending.insert(domain_id.clone());
        }

        let created = self.populate(&domain_id, &dir, &props);
        self.index.lock().pending.remove(&domain_id);

        let handle = match created {
            Ok(handle) => handle,
            Err(e) => {
                self.discard_directory(&dir);
                return Err(e);
            }
        };
        if let Err(e) = handle.start_sync_task() {
            self.evict(&handle);
            self.discard_directory(&dir);
            return Err(e);
        }

        tracing::info!(domain_id = %domain_id, external_id = ?props.external_id, "domain created");
        Ok(domain_id)
    }

    /// Copy the template, write the properties and register the new domain
    fn populate(
        &self,
        domain_id: &str,
        dir: &Path,
        props: &WritableDomainProperties,
    ) -> PapResult<Arc<DomainHandle>> {
        self.fs.copy_dir(&self.template, dir, DOMAIN_DIR_MAX_DEPTH)?;
        // the template may carry quota defaults
        let mut properties = self.properties_repo.load(dir)?;
        properties.apply_writable(props);
        self.properties_repo.save(dir, &properties)?;

        let handle = DomainHandle::open(domain_id, dir, Arc::clone(&self.context), &self.index)?;
        let inserted = self.index.lock().insert(&handle);
        if let Err(e) = inserted {
            handle.close();
            return Err(e);
        }
        Ok(handle)
    }

    fn discard_directory(&self, dir: &Path) {
        if let Err(e) = self.fs.delete_dir(dir, DOMAIN_DIR_MAX_DEPTH) {
            tracing::error!(dir = %dir.display(), error = %e, "failed to remove directory of failed domain creation");
        }
    }

    /// Look up a domain, loading it from disk if not cached yet
    ///
    /// A cached domain whose directory vanished is evicted.
    pub fn get(&self, domain_id: &str) -> PapResult<Option<Arc<DomainHandle>>> {
        let cached = {
            let index = self.index.lock();
            if index.pending.contains(domain_id) {
                return Ok(None);
            }
            index.get(domain_id)
        };

        if let Some(handle) = cached {
            if handle.directory().is_dir() {
                return Ok(Some(handle));
            }
            tracing::info!(domain_id, "domain directory removed, evicting domain");
            self.evict(&handle);
            return Ok(None);
        }

        if !is_valid_domain_dir_name(domain_id) || !self.root.join(domain_id).is_dir() {
            return Ok(None);
        }
        self.adopt(domain_id).map(Some)
    }

    pub fn contains(&self, domain_id: &str) -> PapResult<bool> {
        self.ensure_admin("check domain existence")?;
        if self.index.lock().domains.contains_key(domain_id) {
            return Ok(true);
        }
        Ok(is_valid_domain_dir_name(domain_id) && self.root.join(domain_id).is_dir())
    }

    /// Domain bound to `external_id`, if any
    pub fn domain_id_by_external_id(&self, external_id: &str) -> PapResult<Option<String>> {
        self.ensure_admin("look up domain by externalId")?;
        let handle = {
            let index = self.index.lock();
            match index.external_ids.get(external_id) {
                Some(domain_id) => index.get(domain_id),
                None => None,
            }
        };
        let Some(handle) = handle else {
            return Ok(None);
        };

        if !handle.directory().is_dir() {
            tracing::info!(domain_id = %handle.domain_id(), external_id, "domain directory removed, evicting domain");
            self.evict(&handle);
            return Ok(None);
        }
        Ok(Some(handle.domain_id().to_string()))
    }

    /// IDs of the domains currently loaded
    pub fn domain_ids(&self) -> BTreeSet<String> {
        self.index.lock().domains.keys().cloned().collect()
    }

    /// Synchronize the registry and every domain with the root directory
    ///
    /// Returns the IDs of the live domains afterwards.
    pub fn reconcile_all(&self) -> PapResult<BTreeSet<String>> {
        self.ensure_admin("list domains")?;
        let (vanished, discovered, remaining) = {
            let mut index = self.index.lock();
            let on_disk = self.scan()?;

            let vanished_ids: Vec<String> = index
                .domains
                .keys()
                .filter(|id| !on_disk.contains(*id))
                .cloned()
                .collect();
            let vanished: Vec<Arc<DomainHandle>> = vanished_ids
                .iter()
                .filter_map(|id| index.remove(id))
                .collect();
            let discovered: Vec<String> = on_disk
                .into_iter()
                .filter(|id| !index.is_taken(id))
                .collect();
            (vanished, discovered, index.handles())
        };

        for handle in vanished {
            tracing::info!(domain_id = %handle.domain_id(), "domain directory removed, evicting domain");
            handle.close();
        }
        for domain_id in discovered {
            if let Err(e) = self.adopt(&domain_id) {
                tracing::error!(domain_id = %domain_id, error = %e, "failed to load new domain");
            }
        }
        for handle in remaining {
            if let Err(e) = handle.reconcile() {
                tracing::error!(domain_id = %handle.domain_id(), error = %e, "error synchronizing domain with directory");
            }
        }
        Ok(self.domain_ids())
    }

    /// Delete a domain and its directory
    ///
    /// Returns the properties the domain had, `None` if it did not exist.
    pub fn remove_domain(&self, domain_id: &str) -> PapResult<Option<ReadableDomainProperties>> {
        self.ensure_admin("remove domain")?;
        let cached = {
            let index = self.index.lock();
            if index.pending.contains(domain_id) {
                return Ok(None);
            }
            index.get(domain_id)
        };

        let removed = match cached {
            Some(handle) => {
                let props = handle.delete_directory(&self.fs)?;
                self.evict(&handle);
                props
            }
            None => {
                if !is_valid_domain_dir_name(domain_id) {
                    return Ok(None);
                }
                let dir = self.root.join(domain_id);
                if !dir.is_dir() {
                    return Ok(None);
                }
                let properties = self.properties_repo.load(&dir)?;
                self.fs.delete_dir(&dir, DOMAIN_DIR_MAX_DEPTH)?;
                ReadableDomainProperties {
                    domain_id: domain_id.to_string(),
                    description: properties.description,
                    external_id: properties.external_id,
                }
            }
        };

        tracing::info!(domain_id, "domain removed");
        Ok(Some(removed))
    }

    /// Close every domain; the registry is empty afterwards
    pub fn close(&self) {
        let handles: Vec<Arc<DomainHandle>> = {
            let mut index = self.index.lock();
            index.external_ids.clear();
            index.domains.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.close();
        }
    }

    /// Load an existing domain directory and register it
    fn adopt(&self, domain_id: &str) -> PapResult<Arc<DomainHandle>> {
        let dir = self.root.join(domain_id);
        let handle = DomainHandle::open(domain_id, &dir, Arc::clone(&self.context), &self.index)?;

        let registered = {
            let mut index = self.index.lock();
            match index.get(domain_id) {
                Some(existing) => Ok(Some(existing)),
                None => index.insert(&handle).map(|()| None),
            }
        };
        match registered {
            // loaded concurrently by another caller
            Ok(Some(existing)) => {
                handle.close();
                Ok(existing)
            }
            Ok(None) => {
                if let Err(e) = handle.start_sync_task() {
                    self.evict(&handle);
                    return Err(e);
                }
                tracing::info!(domain_id, external_id = ?handle.external_id(), "domain loaded");
                Ok(handle)
            }
            Err(e) => {
                handle.close();
                Err(e)
            }
        }
    }

    /// Unregister and close a domain
    fn evict(&self, handle: &Arc<DomainHandle>) {
        let evicted = self.index.lock().remove_if_same(handle.domain_id(), handle);
        drop(evicted);
        handle.close();
    }

    /// Domain directory names under the root
    fn scan(&self) -> PapResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for name in self.fs.list_subdirs(&self.root)? {
            if is_valid_domain_dir_name(&name) {
                ids.insert(name);
            } else {
                tracing::warn!(name = %name, root = %self.root.display(), "ignoring invalid domain directory name");
            }
        }
        Ok(ids)
    }
}

impl std::fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRegistry")
            .field("root", &self.root)
            .field("template", &self.template)
            .field("domains", &self.domain_ids())
            .finish()
    }
}

fn check_directory(path: &Path, what: &str, writable: bool) -> PapResult<()> {
    let metadata = std::fs::metadata(path).map_err(|e| PapError::storage("access", path, e))?;
    if !metadata.is_dir() {
        return Err(PapError::invalid(format!(
            "{what} '{}' is not a directory",
            path.display()
        )));
    }
    if writable && metadata.permissions().readonly() {
        return Err(PapError::invalid(format!(
            "{what} '{}' is not writable",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::infrastructure::engine::StaticRefEngineBuilder;
    use crate::test_support::template_dir;
    use tempfile::tempdir;

    fn open(root: &Path, template: &Path) -> DomainRegistry {
        DomainRegistry::open(
            RegistrySettings::new(root, template),
            Arc::new(StaticRefEngineBuilder::new()),
        )
        .unwrap()
    }

    #[test]
    fn open_rejects_missing_root() {
        let template = template_dir();
        let err = DomainRegistry::open(
            RegistrySettings::new("/nonexistent/pap/domains", template.path()),
            Arc::new(StaticRefEngineBuilder::new()),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageIo);
    }

    #[test]
    fn open_rejects_file_as_template() {
        let root = tempdir().unwrap();
        let file = root.path().join("template.toml");
        std::fs::write(&file, "").unwrap();
        let err = DomainRegistry::open(
            RegistrySettings::new(root.path(), &file),
            Arc::new(StaticRefEngineBuilder::new()),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn create_binds_external_id_once() {
        let root = tempdir().unwrap();
        let template = template_dir();
        let registry = open(root.path(), template.path());

        let id = registry
            .create_domain(WritableDomainProperties::new(Some("first"), Some("ext")))
            .unwrap();
        assert_eq!(registry.domain_id_by_external_id("ext").unwrap(), Some(id.clone()));

        let err = registry
            .create_domain(WritableDomainProperties::new(None, Some("ext")))
            .unwrap_err();
        assert!(matches!(err, PapError::ExternalIdConflict { .. }));
        // the failed creation left nothing behind
        assert_eq!(registry.domain_ids().len(), 1);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
        registry.close();
    }

    #[test]
    fn existing_domains_are_loaded_on_open() {
        let root = tempdir().unwrap();
        let template = template_dir();
        let id = {
            let registry = open(root.path(), template.path());
            let id = registry
                .create_domain(WritableDomainProperties::new(None, Some("kept")))
                .unwrap();
            registry.close();
            id
        };

        let registry = open(root.path(), template.path());
        assert!(registry.domain_ids().contains(&id));
        assert_eq!(registry.domain_id_by_external_id("kept").unwrap(), Some(id));
        registry.close();
    }

    #[test]
    fn removed_domain_releases_external_id() {
        let root = tempdir().unwrap();
        let template = template_dir();
        let registry = open(root.path(), template.path());

        let id = registry
            .create_domain(WritableDomainProperties::new(Some("doomed"), Some("ext")))
            .unwrap();
        let removed = registry.remove_domain(&id).unwrap().unwrap();
        assert_eq!(removed.description.as_deref(), Some("doomed"));
        assert!(!root.path().join(&id).exists());
        assert_eq!(registry.domain_id_by_external_id("ext").unwrap(), None);
        assert!(registry.remove_domain(&id).unwrap().is_none());

        registry
            .create_domain(WritableDomainProperties::new(None, Some("ext")))
            .unwrap();
        registry.close();
    }

    #[test]
    fn get_ignores_unsafe_names() {
        let root = tempdir().unwrap();
        let template = template_dir();
        let registry = open(root.path(), template.path());
        assert!(registry.get("..").unwrap().is_none());
        assert!(registry.get("missing").unwrap().is_none());
    }

    #[test]
    fn pdp_only_disables_administration() {
        let root = tempdir().unwrap();
        let template = template_dir();
        let registry = DomainRegistry::open(
            RegistrySettings::new(root.path(), template.path()).with_pdp_only(true),
            Arc::new(StaticRefEngineBuilder::new()),
        )
        .unwrap();

        let err = registry
            .create_domain(WritableDomainProperties::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disabled);
        assert_eq!(registry.contains("x").unwrap_err().kind(), ErrorKind::Disabled);
        assert_eq!(registry.reconcile_all().unwrap_err().kind(), ErrorKind::Disabled);
        assert_eq!(registry.remove_domain("x").unwrap_err().kind(), ErrorKind::Disabled);
    }

    #[test]
    fn rebind_ignores_unregistered_domains() {
        let mut index = RegistryIndex::default();
        index.rebind_external_id("ghost", None, Some("ext")).unwrap();
        assert!(index.external_ids.is_empty());
    }
}
