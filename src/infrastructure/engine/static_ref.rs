//! Static-reference engine builder
//!
//! Resolves the root policy reference and every policy it references,
//! directly or indirectly, from the domain's policy store at build time.
//! The resulting engine therefore always knows its applicable policy set.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::entities::{validate_attribute_providers, PdpConfig, PolicyMetadata, PolicyRef};
use crate::domain::ports::{
    EngineBuildRequest, EngineBuilder, EngineError, PolicyEngine, PolicySource,
};
use crate::domain::value_objects::{FeatureCatalog, FeatureKind, PolicyVersion};

/// Maximum policy reference chain length
pub const MAX_REFERENCE_DEPTH: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct StaticRefEngineBuilder {
    catalog: Option<FeatureCatalog>,
}

impl StaticRefEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder accepting the extensions of a custom catalogue
    pub fn with_catalog(catalog: FeatureCatalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    fn check_extensions(&self, config: &PdpConfig) -> Result<(), EngineError> {
        let catalog = self.feature_catalog();
        let lists = [
            (FeatureKind::Datatype, &config.datatypes),
            (FeatureKind::Function, &config.functions),
            (FeatureKind::CombiningAlgorithm, &config.combining_algorithms),
        ];
        for (kind, ids) in lists {
            for id in ids {
                catalog
                    .lookup(kind, id)
                    .map_err(|e| EngineError::invalid(e.to_string()))?;
            }
        }
        for chain in &config.io_proc_chains {
            catalog
                .lookup(FeatureKind::RequestPreproc, &chain.request_preproc)
                .map_err(|e| EngineError::invalid(e.to_string()))?;
            if let Some(postproc) = &chain.result_postproc {
                catalog
                    .lookup(FeatureKind::ResultPostproc, postproc)
                    .map_err(|e| EngineError::invalid(e.to_string()))?;
            }
        }
        validate_attribute_providers(&config.attribute_providers)
            .map_err(|e| EngineError::invalid(e.to_string()))
    }
}

impl EngineBuilder for StaticRefEngineBuilder {
    fn build(&self, request: &EngineBuildRequest<'_>) -> Result<Box<dyn PolicyEngine>, EngineError> {
        self.check_extensions(request.config)?;

        let mut resolver = Resolver {
            source: request.policies,
            resolved: BTreeMap::new(),
            ordered: Vec::new(),
            stack: Vec::new(),
        };
        resolver.resolve(&request.config.root_policy_ref)?;

        tracing::debug!(
            domain_id = request.domain_id,
            policies = resolver.ordered.len(),
            "resolved static policy set"
        );

        Ok(Box::new(StaticRefEngine {
            policies: resolver.ordered,
            closed: AtomicBool::new(false),
        }))
    }

    fn feature_catalog(&self) -> &FeatureCatalog {
        self.catalog.as_ref().unwrap_or(FeatureCatalog::builtin())
    }
}

struct Resolver<'a> {
    source: &'a dyn PolicySource,
    resolved: BTreeMap<String, PolicyVersion>,
    ordered: Vec<PolicyMetadata>,
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, policy_ref: &PolicyRef) -> Result<(), EngineError> {
        if self.stack.contains(&policy_ref.id) {
            return Err(EngineError::invalid(format!(
                "circular policy reference: {} -> {}",
                self.stack.join(" -> "),
                policy_ref.id
            )));
        }
        if self.stack.len() >= MAX_REFERENCE_DEPTH {
            return Err(EngineError::invalid(format!(
                "policy reference depth exceeds {MAX_REFERENCE_DEPTH} at '{}'",
                policy_ref.id
            )));
        }

        let version = match &policy_ref.version {
            Some(v) => v.clone(),
            None => self
                .source
                .latest_version(&policy_ref.id)?
                .ok_or_else(|| no_match(policy_ref))?,
        };

        if let Some(existing) = self.resolved.get(&policy_ref.id) {
            if *existing != version {
                return Err(EngineError::invalid(format!(
                    "policy '{}' referenced with conflicting versions {existing} and {version}",
                    policy_ref.id
                )));
            }
            return Ok(());
        }

        let doc = self
            .source
            .read_version(&policy_ref.id, &version)?
            .ok_or_else(|| no_match(policy_ref))?;
        if doc.id != policy_ref.id || doc.version != version {
            return Err(EngineError::invalid(format!(
                "policy file for '{}' v{version} declares '{}' v{}",
                policy_ref.id, doc.id, doc.version
            )));
        }

        self.resolved.insert(doc.id.clone(), version);
        self.ordered.push(doc.metadata());

        self.stack.push(doc.id.clone());
        for child in &doc.policy_refs {
            self.resolve(child)?;
        }
        self.stack.pop();
        Ok(())
    }
}

fn no_match(policy_ref: &PolicyRef) -> EngineError {
    EngineError::invalid(format!("no policy matching reference {policy_ref}"))
}

/// Engine over a statically resolved policy set
#[derive(Debug)]
pub struct StaticRefEngine {
    policies: Vec<PolicyMetadata>,
    closed: AtomicBool,
}

impl StaticRefEngine {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl PolicyEngine for StaticRefEngine {
    fn applicable_policies(&self) -> Option<Vec<PolicyMetadata>> {
        Some(self.policies.clone())
    }

    fn close(&self) -> Result<(), EngineError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
