//! Domain handle
//!
//! In-memory representative of one domain directory. Every administrative
//! operation runs under the domain lock (`state`). The current engine and
//! the cached externalId are readable without it.
//!
//! Lock order is domain lock, then registry lock. The registry never waits
//! for a domain lock while holding its own.

mod pdp;
mod policies;
mod properties;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, MutexGuard, RwLock};

use super::engine_lifecycle::{EngineLifecycle, LoadedEngine, SharedEngine};
use super::registry::{RegistryIndex, SharedIndex};
use super::sync_task::SyncTask;
use crate::domain::entities::DomainProperties;
use crate::domain::ports::EngineBuilder;
use crate::error::{PapError, PapResult};
use crate::infrastructure::repositories::TomlPropertiesRepository;

/// Settings shared by every domain of a registry
pub(crate) struct DomainContext {
    pub builder: Arc<dyn EngineBuilder>,
    pub pdp_only: bool,
    pub enable_json_profile: bool,
    pub sync_interval: Option<Duration>,
    pub shutdown_timeout: Duration,
}

/// Result of [`DomainHandle::reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainSyncOutcome {
    Unchanged,
    /// The engine was rebuilt
    Reloaded,
    /// The domain directory is gone; the domain was evicted
    Removed,
}

pub(crate) struct DomainState {
    engine: EngineLifecycle,
    properties: DomainProperties,
    properties_modified: Option<SystemTime>,
}

pub struct DomainHandle {
    domain_id: String,
    dir: PathBuf,
    context: Arc<DomainContext>,
    properties_repo: TomlPropertiesRepository,
    engine: SharedEngine,
    external_id: RwLock<Option<String>>,
    state: Mutex<DomainState>,
    index: Weak<Mutex<RegistryIndex>>,
    task: Mutex<Option<SyncTask>>,
    closed: AtomicBool,
}

impl DomainHandle {
    /// Load a domain from its directory, building its engine
    ///
    /// The handle is not registered anywhere yet; the caller binds its
    /// externalId in the registry index.
    pub(crate) fn open(
        domain_id: &str,
        dir: &Path,
        context: Arc<DomainContext>,
        index: &SharedIndex,
    ) -> PapResult<Arc<Self>> {
        let properties_repo = TomlPropertiesRepository::new();
        let properties = properties_repo.load(dir)?;
        let properties_modified = properties_repo.modified(dir)?;
        let engine = EngineLifecycle::load(domain_id, dir, Arc::clone(&context.builder))?;

        Ok(Arc::new(Self {
            domain_id: domain_id.to_string(),
            dir: dir.to_path_buf(),
            context,
            properties_repo,
            engine: engine.shared(),
            external_id: RwLock::new(properties.external_id.clone()),
            state: Mutex::new(DomainState {
                engine,
                properties,
                properties_modified,
            }),
            index: Arc::downgrade(index),
            task: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }

    pub fn domain_id(&self) -> &str {
        &self.domain_id
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Cached externalId, readable without the domain lock
    pub fn external_id(&self) -> Option<String> {
        self.external_id.read().clone()
    }

    /// Current engine, `None` in error state or after close
    pub fn engine(&self) -> Option<Arc<LoadedEngine>> {
        self.engine.load_full()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Take the domain lock, failing once the domain is closed or its
    /// directory is gone
    fn lock_live(&self) -> PapResult<MutexGuard<'_, DomainState>> {
        let state = self.state.lock();
        if self.is_closed() || !self.dir.is_dir() {
            return Err(PapError::DomainNotFound {
                domain_id: self.domain_id.clone(),
            });
        }
        Ok(state)
    }

    fn ensure_admin(&self, operation: &'static str) -> PapResult<()> {
        if self.context.pdp_only {
            return Err(PapError::Disabled { operation });
        }
        Ok(())
    }

    pub(crate) fn set_cached_external_id(&self, external_id: Option<String>) {
        *self.external_id.write() = external_id;
    }

    /// Move this domain's externalId binding from `old` to `new`
    ///
    /// Index and cached value change in the same registry critical section.
    fn bind_external_id(&self, old: Option<&str>, new: Option<&str>) -> PapResult<()> {
        match self.index.upgrade() {
            Some(index) => {
                let mut index = index.lock();
                index.rebind_external_id(&self.domain_id, old, new)?;
                self.set_cached_external_id(new.map(str::to_string));
            }
            None => self.set_cached_external_id(new.map(str::to_string)),
        }
        Ok(())
    }

    /// Fails if `external_id` is bound to another domain
    fn check_external_id_free(&self, external_id: Option<&str>) -> PapResult<()> {
        let (Some(external_id), Some(index)) = (external_id, self.index.upgrade()) else {
            return Ok(());
        };
        let index = index.lock();
        index.check_external_id_free(&self.domain_id, external_id)
    }

    /// Start background reconciliation if configured
    pub(crate) fn start_sync_task(self: &Arc<Self>) -> PapResult<()> {
        let Some(interval) = self.context.sync_interval else {
            return Ok(());
        };
        let task = SyncTask::spawn(Arc::downgrade(self), &self.domain_id, interval)?;
        *self.task.lock() = Some(task);
        Ok(())
    }

    /// Bring the in-memory state in line with the domain directory
    pub fn reconcile(&self) -> PapResult<DomainSyncOutcome> {
        let outcome = {
            let mut state = self.state.lock();
            if !self.dir.is_dir() {
                DomainSyncOutcome::Removed
            } else {
                self.sync_properties(&mut state)?;
                if state.engine.reconcile()? {
                    DomainSyncOutcome::Reloaded
                } else {
                    DomainSyncOutcome::Unchanged
                }
            }
        };

        if outcome == DomainSyncOutcome::Removed {
            tracing::info!(domain_id = %self.domain_id, dir = %self.dir.display(), "domain directory removed, evicting domain");
            self.evict_from_registry();
            self.close();
        }
        Ok(outcome)
    }

    /// Drop this handle from the registry index (if still registered)
    fn evict_from_registry(&self) {
        let Some(index) = self.index.upgrade() else {
            return;
        };
        let evicted = index.lock().remove_if_same(&self.domain_id, self);
        // released outside the registry lock
        drop(evicted);
    }

    /// Stop background reconciliation and close the engine
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let task = self.task.lock().take();
        if let Some(mut task) = task {
            task.stop(self.context.shutdown_timeout);
        }

        self.state.lock().engine.shutdown();
        tracing::info!(domain_id = %self.domain_id, "domain closed");
    }

    /// Re-read `properties.toml` if it changed since last read
    fn sync_properties(&self, state: &mut DomainState) -> PapResult<()> {
        let modified = self.properties_repo.modified(&self.dir)?;
        if modified == state.properties_modified {
            return Ok(());
        }

        tracing::debug!(domain_id = %self.domain_id, "domain properties file changed, reloading");
        let mut properties = self.properties_repo.load(&self.dir)?;
        let old_external_id = state.properties.external_id.clone();
        if properties.external_id != old_external_id {
            if let Err(e) = self.bind_external_id(
                old_external_id.as_deref(),
                properties.external_id.as_deref(),
            ) {
                tracing::error!(domain_id = %self.domain_id, error = %e, "ignoring externalId change made on disk");
                properties.external_id = old_external_id;
            }
        }
        state.properties = properties;
        state.properties_modified = modified;
        Ok(())
    }
}

impl std::fmt::Debug for DomainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainHandle")
            .field("domain_id", &self.domain_id)
            .field("dir", &self.dir)
            .field("external_id", &self.external_id())
            .finish()
    }
}
