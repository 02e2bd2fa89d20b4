//! Engine lifecycle
//!
//! Owns the compiled decision engine of one domain. A new engine is always
//! fully built (and, for in-memory configurations, persisted) before it
//! replaces the current one, so readers never see a half-built instance and
//! a failed reload leaves the previous engine in place.
//!
//! All mutating methods require the caller to hold the domain lock; reads of
//! the current engine through [`EngineLifecycle::shared`] are lock-free.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};

use crate::domain::entities::{PdpConfig, PolicyMetadata};
use crate::domain::ports::{EngineBuildRequest, EngineBuilder, PolicyEngine};
use crate::domain::value_objects::PolicyVersion;
use crate::error::{PapError, PapResult};
use crate::infrastructure::repositories::{PolicyVersionStore, TomlPdpConfigRepository};

/// Where a reload takes its configuration from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// `pdp.toml` as currently on disk
    Disk,
    /// Candidate configuration, written to `pdp.toml` only if the build succeeds
    InMemory(PdpConfig),
}

/// A built engine together with its statically known policy set
pub struct LoadedEngine {
    domain_id: String,
    engine: Box<dyn PolicyEngine>,
    applicable: Vec<PolicyMetadata>,
    closed: AtomicBool,
}

impl LoadedEngine {
    pub fn engine(&self) -> &dyn PolicyEngine {
        self.engine.as_ref()
    }

    /// Root policy first, then the policies it references
    pub fn applicable_policies(&self) -> &[PolicyMetadata] {
        &self.applicable
    }

    pub fn root_policy(&self) -> &PolicyMetadata {
        &self.applicable[0]
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the engine; later calls do nothing
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.engine.close() {
            tracing::warn!(domain_id = %self.domain_id, error = %e, "error closing PDP engine");
        }
    }
}

impl Drop for LoadedEngine {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LoadedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedEngine")
            .field("domain_id", &self.domain_id)
            .field("applicable", &self.applicable)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Lock-free handle on the current engine of a domain
pub type SharedEngine = Arc<ArcSwapOption<LoadedEngine>>;

pub struct EngineLifecycle {
    domain_id: String,
    domain_dir: PathBuf,
    builder: Arc<dyn EngineBuilder>,
    configs: TomlPdpConfigRepository,
    current: SharedEngine,
    store: PolicyVersionStore,
    last_synced: SystemTime,
    /// Policy directory mtimes produced by our own writes since `last_synced`
    acknowledged: HashMap<String, SystemTime>,
}

impl EngineLifecycle {
    /// Build the initial engine from the on-disk configuration
    pub fn load(
        domain_id: &str,
        domain_dir: &Path,
        builder: Arc<dyn EngineBuilder>,
    ) -> PapResult<Self> {
        let started = SystemTime::now();
        let configs = TomlPdpConfigRepository::new();
        let config = configs.load(domain_dir)?;
        let store = PolicyVersionStore::new(domain_dir, &config.policy_store);

        let lifecycle = Self {
            domain_id: domain_id.to_string(),
            domain_dir: domain_dir.to_path_buf(),
            builder,
            configs,
            current: Arc::new(ArcSwapOption::empty()),
            store,
            last_synced: started,
            acknowledged: HashMap::new(),
        };
        let engine = lifecycle.build(&config, &lifecycle.store)?;
        lifecycle.current.store(Some(Arc::new(engine)));

        tracing::info!(domain_id, "PDP engine loaded");
        Ok(lifecycle)
    }

    pub fn shared(&self) -> SharedEngine {
        Arc::clone(&self.current)
    }

    /// Policy store matching the active configuration
    pub fn store(&self) -> &PolicyVersionStore {
        &self.store
    }

    pub fn builder(&self) -> &dyn EngineBuilder {
        self.builder.as_ref()
    }

    pub fn is_in_error(&self) -> bool {
        self.current.load().is_none()
    }

    pub fn last_synced(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.last_synced)
    }

    pub fn load_config(&self) -> PapResult<PdpConfig> {
        self.configs.load(&self.domain_dir)
    }

    fn build(&self, config: &PdpConfig, store: &PolicyVersionStore) -> PapResult<LoadedEngine> {
        let request = EngineBuildRequest {
            domain_id: &self.domain_id,
            domain_dir: &self.domain_dir,
            config,
            policies: store,
        };
        let engine = self
            .builder
            .build(&request)
            .map_err(|e| PapError::EngineBuildFailed {
                domain_id: self.domain_id.clone(),
                message: e.to_string(),
            })?;

        let applicable = engine.applicable_policies();
        let loaded = LoadedEngine {
            domain_id: self.domain_id.clone(),
            engine,
            applicable: applicable.clone().unwrap_or_default(),
            closed: AtomicBool::new(false),
        };

        match applicable {
            None => Err(PapError::NonStaticPolicySet {
                domain_id: self.domain_id.clone(),
            }),
            Some(policies) if policies.is_empty() => Err(PapError::EngineBuildFailed {
                domain_id: self.domain_id.clone(),
                message: "engine reported no root policy".to_string(),
            }),
            // dropping `loaded` on the error paths closes the engine
            Some(_) => Ok(loaded),
        }
    }

    /// Build a new engine and swap it in
    pub fn reload(&mut self, source: ConfigSource) -> PapResult<()> {
        let started = SystemTime::now();
        let (config, persist) = match source {
            ConfigSource::Disk => (self.configs.load(&self.domain_dir)?, false),
            ConfigSource::InMemory(config) => (config, true),
        };
        let store = PolicyVersionStore::new(&self.domain_dir, &config.policy_store);
        let engine = self.build(&config, &store)?;

        let mut synced = started;
        if persist {
            // on failure `engine` is dropped, which closes it
            self.configs.save(&self.domain_dir, &config)?;
            // our own write must not look like an external edit
            if let Ok(written) = self.configs.modified(&self.domain_dir) {
                synced = synced.max(written);
            }
        }

        let previous = self.current.swap(Some(Arc::new(engine)));
        self.store = store;
        self.last_synced = synced;
        self.acknowledged.clear();
        if let Some(previous) = previous {
            previous.close();
        }

        tracing::info!(domain_id = %self.domain_id, persisted = persist, "PDP engine reloaded");
        Ok(())
    }

    /// Close the current engine and stay without one until an explicit
    /// successful reload
    pub fn force_error_state(&mut self) {
        if let Some(previous) = self.current.swap(None) {
            previous.close();
        }
        tracing::error!(domain_id = %self.domain_id, "PDP engine forced into error state");
    }

    /// Close the current engine on domain shutdown
    pub fn shutdown(&mut self) {
        if let Some(previous) = self.current.swap(None) {
            previous.close();
        }
    }

    pub fn applicable_policy_refs(&self) -> PapResult<Vec<PolicyMetadata>> {
        let current = self.current.load_full().ok_or_else(|| PapError::EngineInError {
            domain_id: self.domain_id.clone(),
        })?;
        Ok(current.applicable_policies().to_vec())
    }

    /// Record a write of ours to the directory of `policy_id`
    ///
    /// Writes that leave the applicable policy set unchanged (older
    /// versions, rollbacks, evictions) do not trigger a reload on the next
    /// [`reconcile`](Self::reconcile). A later edit of the same directory
    /// still does.
    pub fn acknowledge_policy_write(&mut self, policy_id: &str) {
        match self.store.policy_dir_modified(policy_id) {
            Ok(Some(modified)) => {
                self.acknowledged.insert(policy_id.to_string(), modified);
            }
            Ok(None) => {
                self.acknowledged.remove(policy_id);
            }
            Err(e) => {
                tracing::warn!(domain_id = %self.domain_id, policy_id, error = %e, "cannot read policy directory mtime");
            }
        }
    }

    /// Version of `policy_id` used by the current engine, if any
    pub fn active_version_of(&self, policy_id: &str) -> Option<PolicyVersion> {
        self.current.load().as_ref().and_then(|engine| {
            engine
                .applicable_policies()
                .iter()
                .find(|m| m.id == policy_id)
                .map(|m| m.version.clone())
        })
    }

    /// Reload if the configuration or an applicable policy changed on disk
    ///
    /// Returns whether a reload happened. Does nothing in error state. A
    /// failed reload caused by a policy change forces the error state.
    pub fn reconcile(&mut self) -> PapResult<bool> {
        let Some(current) = self.current.load_full() else {
            return Ok(false);
        };
        let started = SystemTime::now();

        let config_modified = self.configs.modified(&self.domain_dir)?;
        let config_changed = config_modified > self.last_synced;
        tracing::debug!(
            domain_id = %self.domain_id,
            modified = %DateTime::<Utc>::from(config_modified),
            last_synced = %self.last_synced(),
            changed = config_changed,
            "checked PDP configuration file"
        );
        if config_changed {
            self.reload(ConfigSource::Disk)?;
            return Ok(true);
        }

        for policy in current.applicable_policies() {
            let changed = match self.store.policy_dir_modified(&policy.id)? {
                None => true,
                Some(modified) => {
                    modified > self.last_synced
                        && self.acknowledged.get(&policy.id) != Some(&modified)
                }
            };
            if !changed {
                continue;
            }

            tracing::debug!(domain_id = %self.domain_id, policy_id = %policy.id, "applicable policy changed on disk");
            return match self.reload(ConfigSource::Disk) {
                Ok(()) => Ok(true),
                Err(e) => {
                    self.force_error_state();
                    Err(e)
                }
            };
        }

        // acknowledged writes all predate `started`
        if self.acknowledged.values().all(|&t| t <= started) {
            self.acknowledged.clear();
            self.last_synced = started;
        }
        Ok(false)
    }
}
