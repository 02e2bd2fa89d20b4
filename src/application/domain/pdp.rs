//! Engine configuration administration
//!
//! Every change is validated, built into a new engine and persisted only
//! once that engine is ready.

use super::{DomainHandle, DomainState};
use crate::application::engine_lifecycle::ConfigSource;
use crate::domain::entities::{
    validate_attribute_providers, AttributeProviderConfig, PdpConfig, PdpProperties,
    PolicyMetadata, WritablePdpProperties,
};
use crate::error::PapResult;

impl DomainHandle {
    pub fn get_pdp_properties(&self) -> PapResult<PdpProperties> {
        self.ensure_admin("get PDP properties")?;
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        let config = state.engine.load_config()?;
        self.pdp_properties(&state, &config)
    }

    /// Change the root policy reference and the enabled features
    pub fn set_pdp_properties(&self, props: WritablePdpProperties) -> PapResult<PdpProperties> {
        self.ensure_admin("set PDP properties")?;
        let mut state = self.lock_live()?;

        let mut config = state.engine.load_config()?;
        config.apply_features(&props.features, state.engine.builder().feature_catalog())?;
        config.root_policy_ref = props.root_policy_ref;

        state.engine.reload(ConfigSource::InMemory(config.clone()))?;
        self.pdp_properties(&state, &config)
    }

    pub fn get_attribute_providers(&self) -> PapResult<Vec<AttributeProviderConfig>> {
        self.ensure_admin("get attribute providers")?;
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        Ok(state.engine.load_config()?.attribute_providers)
    }

    pub fn set_attribute_providers(
        &self,
        providers: Vec<AttributeProviderConfig>,
    ) -> PapResult<Vec<AttributeProviderConfig>> {
        self.ensure_admin("set attribute providers")?;
        validate_attribute_providers(&providers)?;
        let mut state = self.lock_live()?;

        let mut config = state.engine.load_config()?;
        config.attribute_providers = providers.clone();
        state.engine.reload(ConfigSource::InMemory(config))?;
        tracing::info!(domain_id = %self.domain_id, count = providers.len(), "attribute providers updated");
        Ok(providers)
    }

    /// Policies used by the engine, root first
    pub fn applicable_policy_refs(&self) -> PapResult<Vec<PolicyMetadata>> {
        let mut state = self.lock_live()?;
        state.engine.reconcile()?;
        state.engine.applicable_policy_refs()
    }

    fn pdp_properties(&self, state: &DomainState, config: &PdpConfig) -> PapResult<PdpProperties> {
        let mut applicable = state
            .engine
            .applicable_policy_refs()?
            .into_iter()
            .map(|m| m.to_ref());
        // never empty: the engine is only accepted with a root policy
        let applicable_root_policy_ref = applicable
            .next()
            .unwrap_or_else(|| config.root_policy_ref.clone());

        Ok(PdpProperties {
            features: config.feature_states(
                state.engine.builder().feature_catalog(),
                self.context.enable_json_profile,
            ),
            root_policy_ref_expression: config.root_policy_ref.clone(),
            applicable_root_policy_ref,
            other_applicable_policy_refs: applicable.collect(),
            last_modified: state.engine.last_synced(),
        })
    }
}
