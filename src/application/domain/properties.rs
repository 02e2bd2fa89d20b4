//! Domain properties and policy repository quotas

use super::DomainHandle;
use crate::application::registry::DOMAIN_DIR_MAX_DEPTH;
use crate::domain::entities::{PrpProperties, ReadableDomainProperties, WritableDomainProperties};
use crate::domain::ports::FileSystem;
use crate::error::{PapError, PapResult};
use crate::infrastructure::fs::LocalFs;

impl DomainHandle {
    pub fn get_properties(&self) -> PapResult<ReadableDomainProperties> {
        self.ensure_admin("get domain properties")?;
        let mut state = self.lock_live()?;
        self.sync_properties(&mut state)?;
        Ok(self.readable(&state.properties.description))
    }

    /// Update description and externalId
    ///
    /// The externalId must not be bound to another domain.
    pub fn set_properties(
        &self,
        props: WritableDomainProperties,
    ) -> PapResult<ReadableDomainProperties> {
        self.ensure_admin("set domain properties")?;
        let props = props.normalized();

        let mut state = self.lock_live()?;
        self.sync_properties(&mut state)?;
        self.check_external_id_free(props.external_id.as_deref())?;

        let previous = state.properties.clone();
        let mut updated = previous.clone();
        updated.apply_writable(&props);
        self.properties_repo.save(&self.dir, &updated)?;

        // the externalId may have been taken by another domain meanwhile
        if let Err(e) = self.bind_external_id(
            previous.external_id.as_deref(),
            updated.external_id.as_deref(),
        ) {
            if let Err(restore) = self.properties_repo.save(&self.dir, &previous) {
                tracing::error!(domain_id = %self.domain_id, error = %restore, "failed to restore domain properties");
            }
            return Err(e);
        }

        state.properties = updated;
        state.properties_modified = self.properties_repo.modified(&self.dir)?;
        tracing::info!(domain_id = %self.domain_id, external_id = ?props.external_id, "domain properties updated");
        Ok(self.readable(&state.properties.description))
    }

    pub fn get_prp_properties(&self) -> PapResult<PrpProperties> {
        self.ensure_admin("get policy repository properties")?;
        let mut state = self.lock_live()?;
        self.sync_properties(&mut state)?;
        Ok(state.properties.prp())
    }

    /// Update quotas; they may not be set below what the repository holds
    pub fn set_prp_properties(&self, prp: PrpProperties) -> PapResult<PrpProperties> {
        self.ensure_admin("set policy repository properties")?;
        let mut state = self.lock_live()?;
        self.sync_properties(&mut state)?;

        let mut updated = state.properties.clone();
        updated.apply_prp(&prp);
        let prp = updated.prp();
        let store = state.engine.store();

        if let Some(max) = prp.max_policy_count {
            let count = store.count_policies()?;
            if count > max as usize {
                return Err(PapError::invalid(format!(
                    "invalid max_policy_count ({max}): smaller than the current number of policies ({count})"
                )));
            }
        }
        if let Some(max) = prp.max_version_count_per_policy {
            if let Some((policy_id, count)) = store.first_policy_exceeding(max as usize)? {
                return Err(PapError::invalid(format!(
                    "invalid max_version_count_per_policy ({max}): smaller than the number of versions ({count}) of policy '{policy_id}'"
                )));
            }
        }

        self.properties_repo.save(&self.dir, &updated)?;
        state.properties = updated;
        state.properties_modified = self.properties_repo.modified(&self.dir)?;
        Ok(prp)
    }

    /// Delete the domain directory, returning the last known properties
    ///
    /// Runs under the domain lock, so no administrative operation is midway
    /// through a write; later ones fail with `DomainNotFound`.
    pub(crate) fn delete_directory(&self, fs: &LocalFs) -> PapResult<ReadableDomainProperties> {
        let state = self.state.lock();
        let props = self.readable(&state.properties.description);
        fs.delete_dir(&self.dir, DOMAIN_DIR_MAX_DEPTH)?;
        Ok(props)
    }

    fn readable(&self, description: &Option<String>) -> ReadableDomainProperties {
        ReadableDomainProperties {
            domain_id: self.domain_id.clone(),
            description: description.clone(),
            external_id: self.external_id(),
        }
    }
}
