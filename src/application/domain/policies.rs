//! Policy administration
//!
//! Adding a version enforces the domain quotas. With version rolling
//! enabled the oldest versions are evicted to make room, except the one the
//! engine currently uses. A failed add leaves the repository as it was.

use std::collections::BTreeSet;

use super::{DomainHandle, DomainState};
use crate::application::engine_lifecycle::ConfigSource;
use crate::domain::entities::PolicyDocument;
use crate::domain::value_objects::PolicyVersion;
use crate::error::{PapError, PapResult};
use crate::infrastructure::repositories::{PolicyVersionStore, PolicyVersions};

impl DomainHandle {
    /// Store a new policy version, returning the stored document
    ///
    /// Adding an existing version is a no-op returning the document
    /// already stored.
    pub fn add_policy(&self, doc: PolicyDocument) -> PapResult<PolicyDocument> {
        self.ensure_admin("add policy")?;
        let mut state = self.lock_live()?;
        self.sync_properties(&mut state)?;
        self.ensure_engine(&state)?;

        let store = state.engine.store().clone();
        let policy_id = doc.id.clone();

        if let Some(existing) = store.read_version(&policy_id, &doc.version)? {
            state.engine.reconcile()?;
            return Ok(existing);
        }

        let prp = state.properties.prp();
        let versions = store.list_versions(&policy_id)?;
        if versions.is_empty() {
            if let Some(max) = prp.max_policy_count {
                if store.count_policies()? >= max as usize {
                    return Err(PapError::TooManyPolicies {
                        domain_id: self.domain_id.clone(),
                        max,
                    });
                }
            }
        }

        let excess = match prp.max_version_count_per_policy {
            Some(max) => (versions.len() + 1).saturating_sub(max as usize),
            None => 0,
        };
        if excess > 0 && !prp.version_rolling_enabled {
            return Err(too_many_versions(&policy_id, &prp.max_version_count_per_policy));
        }

        state.engine.reconcile()?;
        let active_before = state.engine.active_version_of(&policy_id);
        let added = store.add_version(&doc)?;
        if let Some(existing) = added.existing {
            return Ok(existing);
        }
        state.engine.acknowledge_policy_write(&policy_id);

        let mut reloaded = false;
        if active_before.as_ref().is_some_and(|active| *active < doc.version) {
            if let Err(e) = state.engine.reload(ConfigSource::Disk) {
                discard_version(&store, &policy_id, &doc.version);
                state.engine.acknowledge_policy_write(&policy_id);
                return Err(e);
            }
            reloaded = true;
        }

        if excess > 0 {
            let protected = state.engine.active_version_of(&policy_id);
            let versions = store.list_versions(&policy_id)?;
            let plan = eviction_plan(&versions, protected.as_ref(), excess);

            if plan.len() < excess || plan.contains(&doc.version) {
                discard_version(&store, &policy_id, &doc.version);
                state.engine.acknowledge_policy_write(&policy_id);
                if reloaded {
                    self.restore_engine(&mut state);
                }
                return Err(too_many_versions(&policy_id, &prp.max_version_count_per_policy));
            }

            for version in &plan {
                store.remove_version(&policy_id, version)?;
            }
            state.engine.acknowledge_policy_write(&policy_id);
            let evicted: Vec<&str> = plan.iter().map(PolicyVersion::as_str).collect();
            tracing::info!(
                domain_id = %self.domain_id,
                policy_id = %policy_id,
                ?evicted,
                "evicted oldest policy versions"
            );
        }

        tracing::info!(domain_id = %self.domain_id, policy_id = %policy_id, version = %doc.version, "policy version added");
        Ok(doc)
    }

    pub fn get_policy_version(
        &self,
        policy_id: &str,
        version: &PolicyVersion,
    ) -> PapResult<Option<PolicyDocument>> {
        self.ensure_admin("get policy version")?;
        let state = self.lock_live()?;
        state.engine.store().read_version(policy_id, version)
    }

    /// Delete one version unless the engine uses it
    pub fn remove_policy_version(
        &self,
        policy_id: &str,
        version: &PolicyVersion,
    ) -> PapResult<Option<PolicyDocument>> {
        self.ensure_admin("remove policy version")?;
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        self.ensure_engine(&state)?;

        if state.engine.active_version_of(policy_id).as_ref() == Some(version) {
            return Err(PapError::StillInUse {
                policy_id: policy_id.to_string(),
                version: version.to_string(),
            });
        }

        let store = state.engine.store();
        let Some(doc) = store.read_version(policy_id, version)? else {
            return Ok(None);
        };
        store.remove_version(policy_id, version)?;
        state.engine.acknowledge_policy_write(policy_id);
        tracing::info!(domain_id = %self.domain_id, policy_id, version = %version, "policy version removed");
        Ok(Some(doc))
    }

    /// Delete every version of a policy unless the engine uses one of them
    ///
    /// Returns the removed versions, empty if the policy does not exist.
    pub fn remove_policy(&self, policy_id: &str) -> PapResult<Vec<PolicyVersion>> {
        self.ensure_admin("remove policy")?;
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        self.ensure_engine(&state)?;

        if let Some(active) = state.engine.active_version_of(policy_id) {
            return Err(PapError::StillInUse {
                policy_id: policy_id.to_string(),
                version: active.to_string(),
            });
        }

        let removed = state.engine.store().remove_policy(policy_id)?;
        if !removed.is_empty() {
            tracing::info!(domain_id = %self.domain_id, policy_id, versions = removed.len(), "policy removed");
        }
        Ok(removed)
    }

    pub fn latest_version(&self, policy_id: &str) -> PapResult<Option<PolicyVersion>> {
        self.ensure_admin("get latest policy version")?;
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        state.engine.store().latest_version(policy_id)
    }

    pub fn list_versions(&self, policy_id: &str) -> PapResult<PolicyVersions> {
        self.ensure_admin("list policy versions")?;
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        state.engine.store().list_versions(policy_id)
    }

    pub fn list_policy_ids(&self) -> PapResult<BTreeSet<String>> {
        self.ensure_admin("list policies")?;
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        state.engine.store().policy_ids()
    }

    fn ensure_engine(&self, state: &DomainState) -> PapResult<()> {
        if state.engine.is_in_error() {
            return Err(PapError::EngineInError {
                domain_id: self.domain_id.clone(),
            });
        }
        Ok(())
    }

    /// Undo a reload made for a version that was then discarded
    fn restore_engine(&self, state: &mut DomainState) {
        if let Err(e) = state.engine.reload(ConfigSource::Disk) {
            tracing::error!(domain_id = %self.domain_id, error = %e, "failed to restore PDP engine after rollback");
            state.engine.force_error_state();
        }
    }
}

/// Oldest-first versions to evict, never the protected one
fn eviction_plan(
    versions: &PolicyVersions,
    protected: Option<&PolicyVersion>,
    excess: usize,
) -> Vec<PolicyVersion> {
    versions
        .oldest_to_latest()
        .filter(|v| Some(*v) != protected)
        .take(excess)
        .cloned()
        .collect()
}

fn discard_version(store: &PolicyVersionStore, policy_id: &str, version: &PolicyVersion) {
    if let Err(e) = store.remove_version(policy_id, version) {
        tracing::error!(policy_id, version = %version, error = %e, "failed to roll back added policy version");
    }
}

fn too_many_versions(policy_id: &str, max: &Option<u32>) -> PapError {
    PapError::TooManyVersions {
        policy_id: policy_id.to_string(),
        max: max.unwrap_or_default(),
    }
}
