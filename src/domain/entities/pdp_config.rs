//! Engine configuration entity
//!
//! `pdp.toml` describes how the decision engine of a domain is built: the
//! enabled extensions, the root policy reference, where policies are stored
//! and which attribute providers are plugged in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    ExtensionSpec, FeatureCatalog, FeatureKind, PdpFeature, PolicyVersion,
    CORE_STRICT_ATTRIBUTE_ISSUER_MATCH, CORE_XPATH_EVAL, JSON_SINGLE_REQUEST_PREPROC,
    XML_SINGLE_REQUEST_PREPROC,
};
use crate::error::{PapError, PapResult};

/// Persisted content of `pdp.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdpConfig {
    #[serde(default)]
    pub xpath_eval: bool,
    #[serde(default)]
    pub strict_attribute_issuer_match: bool,
    #[serde(default)]
    pub datatypes: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub combining_algorithms: Vec<String>,
    pub root_policy_ref: PolicyRef,
    #[serde(default)]
    pub policy_store: PolicyStoreConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_proc_chains: Vec<IoProcChain>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_providers: Vec<AttributeProviderConfig>,
}

/// Reference to a policy, with an optional exact version (absent = latest)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<PolicyVersion>,
}

impl PolicyRef {
    pub fn latest(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    pub fn exact(id: impl Into<String>, version: PolicyVersion) -> Self {
        Self {
            id: id.into(),
            version: Some(version),
        }
    }
}

impl fmt::Display for PolicyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} v{}", self.id, v),
            None => write!(f, "{} (latest)", self.id),
        }
    }
}

/// Location of policy documents, relative to the domain directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStoreConfig {
    #[serde(default = "default_policy_directory")]
    pub directory: String,
    #[serde(default = "default_policy_suffix")]
    pub suffix: String,
}

fn default_policy_directory() -> String {
    "policies".to_string()
}

fn default_policy_suffix() -> String {
    ".json".to_string()
}

impl Default for PolicyStoreConfig {
    fn default() -> Self {
        Self {
            directory: default_policy_directory(),
            suffix: default_policy_suffix(),
        }
    }
}

/// Request preprocessor and the optional result postprocessor it feeds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoProcChain {
    pub request_preproc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_postproc: Option<String>,
}

/// Attribute provider plugged into the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AttributeProviderConfig {
    /// Fixed attribute values
    Static {
        id: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, Vec<String>>,
    },
    /// Values read from process environment variables
    Environment {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
}

impl AttributeProviderConfig {
    pub fn id(&self) -> &str {
        match self {
            AttributeProviderConfig::Static { id, .. }
            | AttributeProviderConfig::Environment { id, .. } => id,
        }
    }
}

/// Validate a provider list before it reaches the engine builder
pub fn validate_attribute_providers(providers: &[AttributeProviderConfig]) -> PapResult<()> {
    let mut seen = BTreeSet::new();
    for provider in providers {
        let id = provider.id();
        if id.is_empty() {
            return Err(PapError::invalid("attribute provider with empty id"));
        }
        if !seen.insert(id) {
            return Err(PapError::invalid(format!(
                "duplicate attribute provider: '{id}'"
            )));
        }
    }
    Ok(())
}

impl PdpConfig {
    /// Configuration referencing `root` (latest version), defaults elsewhere
    pub fn with_root(root: PolicyRef) -> Self {
        Self {
            xpath_eval: false,
            strict_attribute_issuer_match: false,
            datatypes: Vec::new(),
            functions: Vec::new(),
            combining_algorithms: Vec::new(),
            root_policy_ref: root,
            policy_store: PolicyStoreConfig::default(),
            io_proc_chains: Vec::new(),
            attribute_providers: Vec::new(),
        }
    }

    /// Replace the whole feature selection with `features`
    ///
    /// Features not listed (or listed as disabled) end up disabled. Attribute
    /// providers, root reference and policy store are untouched. Nothing is
    /// modified if validation fails.
    pub fn apply_features(
        &mut self,
        features: &[PdpFeature],
        catalog: &FeatureCatalog,
    ) -> PapResult<()> {
        let mut next = FeatureSelection::default();
        let mut seen = BTreeSet::new();
        // request preprocessors by input type
        let mut preprocs: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
        // result postprocessor (if any) by individual request type
        let mut postprocs: BTreeMap<&str, Option<&str>> = BTreeMap::new();

        for feature in features {
            let spec = catalog.lookup(feature.kind, &feature.id)?;
            if !seen.insert(feature.id.as_str()) {
                return Err(PapError::invalid(format!(
                    "duplicate feature: {}",
                    feature.id
                )));
            }
            if !feature.enabled {
                continue;
            }

            match (feature.kind, spec) {
                (FeatureKind::Core, _) => match feature.id.as_str() {
                    CORE_XPATH_EVAL => next.xpath_eval = true,
                    CORE_STRICT_ATTRIBUTE_ISSUER_MATCH => next.strict_attribute_issuer_match = true,
                    other => {
                        return Err(PapError::invalid(format!(
                            "unsupported {} feature: '{other}'",
                            FeatureKind::Core
                        )))
                    }
                },
                (FeatureKind::Datatype, _) => next.datatypes.push(feature.id.clone()),
                (FeatureKind::Function, _) => next.functions.push(feature.id.clone()),
                (FeatureKind::CombiningAlgorithm, _) => {
                    next.combining_algorithms.push(feature.id.clone())
                }
                (FeatureKind::RequestPreproc, ExtensionSpec::RequestPreproc { input, output }) => {
                    if let Some((existing, _)) = preprocs.get(input) {
                        if *existing != feature.id {
                            return Err(PapError::invalid(format!(
                                "feature conflict on '{existing}' and '{}': these request preprocessors have the same input type ({input}), only one of them may be enabled at a time",
                                feature.id
                            )));
                        }
                    }
                    preprocs.insert(input, (feature.id.as_str(), output));
                    postprocs.entry(output).or_insert(None);
                }
                (FeatureKind::ResultPostproc, ExtensionSpec::ResultPostproc { input }) => {
                    let Some(slot) = postprocs.get_mut(input) else {
                        return Err(PapError::invalid(format!(
                            "cannot enable feature '{}' because no compatible request preprocessor (output must be {input}) is enabled before it",
                            feature.id
                        )));
                    };
                    if let Some(existing) = slot {
                        if *existing != feature.id {
                            return Err(PapError::invalid(format!(
                                "feature conflict on '{existing}' and '{}': these result postprocessors have the same input type ({input}), only one of them may be enabled at a time",
                                feature.id
                            )));
                        }
                    }
                    *slot = Some(feature.id.as_str());
                }
                (kind, _) => {
                    return Err(PapError::invalid(format!(
                        "feature '{}' is not a valid {kind} extension",
                        feature.id
                    )))
                }
            }
        }

        next.io_proc_chains = preprocs
            .values()
            .map(|(request_preproc, output)| IoProcChain {
                request_preproc: request_preproc.to_string(),
                result_postproc: postprocs
                    .get(output)
                    .copied()
                    .flatten()
                    .map(str::to_string),
            })
            .collect();

        self.xpath_eval = next.xpath_eval;
        self.strict_attribute_issuer_match = next.strict_attribute_issuer_match;
        self.datatypes = next.datatypes;
        self.functions = next.functions;
        self.combining_algorithms = next.combining_algorithms;
        self.io_proc_chains = next.io_proc_chains;
        Ok(())
    }

    /// Every catalogue feature with its enabled flag
    ///
    /// When no request preprocessor is configured the engine falls back to
    /// the default XML one (and the default JSON one with the JSON profile),
    /// so those are reported as enabled.
    pub fn feature_states(
        &self,
        catalog: &FeatureCatalog,
        enable_json_profile: bool,
    ) -> Vec<PdpFeature> {
        let mut features = Vec::with_capacity(catalog.len());

        for kind in FeatureKind::ALL {
            let enabled: BTreeSet<String> = match kind {
                FeatureKind::Core => {
                    let mut core = BTreeSet::new();
                    if self.xpath_eval {
                        core.insert(CORE_XPATH_EVAL.to_string());
                    }
                    if self.strict_attribute_issuer_match {
                        core.insert(CORE_STRICT_ATTRIBUTE_ISSUER_MATCH.to_string());
                    }
                    core
                }
                FeatureKind::Datatype => self.datatypes.iter().cloned().collect(),
                FeatureKind::Function => self.functions.iter().cloned().collect(),
                FeatureKind::CombiningAlgorithm => {
                    self.combining_algorithms.iter().cloned().collect()
                }
                FeatureKind::RequestPreproc => {
                    self.enabled_request_preprocs(catalog, enable_json_profile)
                }
                FeatureKind::ResultPostproc => self
                    .io_proc_chains
                    .iter()
                    .filter_map(|c| c.result_postproc.clone())
                    .collect(),
            };

            for id in &enabled {
                features.push(PdpFeature::enabled(kind, id.clone()));
            }
            for id in catalog.ids(kind).filter(|id| !enabled.contains(*id)) {
                features.push(PdpFeature::disabled(kind, id));
            }
        }

        features
    }

    fn enabled_request_preprocs(
        &self,
        catalog: &FeatureCatalog,
        enable_json_profile: bool,
    ) -> BTreeSet<String> {
        let mut enabled: BTreeSet<String> = self
            .io_proc_chains
            .iter()
            .map(|c| c.request_preproc.clone())
            .collect();

        if enabled.is_empty() {
            enabled.insert(XML_SINGLE_REQUEST_PREPROC.to_string());
            if enable_json_profile {
                enabled.insert(JSON_SINGLE_REQUEST_PREPROC.to_string());
            }
        } else if enabled.len() < 2 && enable_json_profile {
            let only = enabled.iter().next().cloned().unwrap_or_default();
            let json_input = matches!(
                catalog.lookup(FeatureKind::RequestPreproc, &only),
                Ok(ExtensionSpec::RequestPreproc { input: "json", .. })
            );
            enabled.insert(if json_input {
                XML_SINGLE_REQUEST_PREPROC.to_string()
            } else {
                JSON_SINGLE_REQUEST_PREPROC.to_string()
            });
        }
        enabled
    }
}

#[derive(Default)]
struct FeatureSelection {
    xpath_eval: bool,
    strict_attribute_issuer_match: bool,
    datatypes: Vec<String>,
    functions: Vec<String>,
    combining_algorithms: Vec<String>,
    io_proc_chains: Vec<IoProcChain>,
}

/// Engine configuration change requested by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritablePdpProperties {
    pub root_policy_ref: PolicyRef,
    pub features: Vec<PdpFeature>,
}

/// Engine configuration as observed by callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdpProperties {
    pub features: Vec<PdpFeature>,
    /// Root reference as configured (version possibly unset)
    pub root_policy_ref_expression: PolicyRef,
    /// Root policy actually used by the engine
    pub applicable_root_policy_ref: PolicyRef,
    /// Policies referenced directly or indirectly by the root
    pub other_applicable_policy_refs: Vec<PolicyRef>,
    pub last_modified: DateTime<Utc>,
}
