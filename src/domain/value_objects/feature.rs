//! PDP features
//!
//! A feature is an engine capability that can be switched on or off through
//! the administration API: core engine flags and the extensions (datatypes,
//! functions, combining algorithms, request/result processors) known to the
//! engine builder. The set of valid identifiers is a [`FeatureCatalog`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{PapError, PapResult};

pub const CORE_XPATH_EVAL: &str = "urn:pap:feature:core:xpath-eval";
pub const CORE_STRICT_ATTRIBUTE_ISSUER_MATCH: &str =
    "urn:pap:feature:core:strict-attribute-issuer-match";

pub const XML_SINGLE_REQUEST_PREPROC: &str = "urn:pap:feature:request-preproc:xml-single-lax";
pub const XML_MULTIPLE_REQUEST_PREPROC: &str =
    "urn:pap:feature:request-preproc:xml-multiple-repeated-categories-lax";
pub const JSON_SINGLE_REQUEST_PREPROC: &str = "urn:pap:feature:request-preproc:json-single-lax";
pub const XML_COMBINED_RESULT_POSTPROC: &str =
    "urn:pap:feature:result-postproc:xml-combined-decision";
pub const JSON_COMBINED_RESULT_POSTPROC: &str =
    "urn:pap:feature:result-postproc:json-combined-decision";

/// Feature type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    Core,
    Datatype,
    Function,
    CombiningAlgorithm,
    RequestPreproc,
    ResultPostproc,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 6] = [
        FeatureKind::Core,
        FeatureKind::Datatype,
        FeatureKind::Function,
        FeatureKind::CombiningAlgorithm,
        FeatureKind::RequestPreproc,
        FeatureKind::ResultPostproc,
    ];

    /// Stable type identifier used by API layers
    pub fn type_id(self) -> &'static str {
        match self {
            FeatureKind::Core => "urn:pap:feature-type:core",
            FeatureKind::Datatype => "urn:pap:feature-type:datatype",
            FeatureKind::Function => "urn:pap:feature-type:function",
            FeatureKind::CombiningAlgorithm => "urn:pap:feature-type:combining-algorithm",
            FeatureKind::RequestPreproc => "urn:pap:feature-type:request-preproc",
            FeatureKind::ResultPostproc => "urn:pap:feature-type:result-postproc",
        }
    }

    /// Parse a type identifier; `None` means [`FeatureKind::Core`]
    pub fn from_type_id(type_id: Option<&str>) -> PapResult<Self> {
        let Some(type_id) = type_id else {
            return Ok(FeatureKind::Core);
        };

        Self::ALL
            .into_iter()
            .find(|k| k.type_id() == type_id)
            .ok_or_else(|| {
                let expected: Vec<_> = Self::ALL.iter().map(|k| k.type_id()).collect();
                PapError::invalid(format!(
                    "invalid feature type: '{type_id}'. Expected one of {expected:?}"
                ))
            })
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_id())
    }
}

/// A feature and whether it is enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdpFeature {
    pub id: String,
    pub kind: FeatureKind,
    pub enabled: bool,
}

impl PdpFeature {
    pub fn enabled(kind: FeatureKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: true,
        }
    }

    pub fn disabled(kind: FeatureKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: false,
        }
    }
}

/// What the catalogue knows about one extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionSpec {
    /// Core flags, datatypes, functions, combining algorithms
    Plain,
    /// Turns requests of `input` type into individual requests of `output` type
    RequestPreproc {
        input: &'static str,
        output: &'static str,
    },
    /// Post-processes results of individual requests of `input` type
    ResultPostproc { input: &'static str },
}

/// Set of valid feature identifiers per kind
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    entries: BTreeMap<FeatureKind, BTreeMap<String, ExtensionSpec>>,
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue of the built-in engine
    pub fn builtin() -> &'static FeatureCatalog {
        static BUILTIN: OnceLock<FeatureCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            FeatureCatalog::new()
                .with(FeatureKind::Core, CORE_XPATH_EVAL, ExtensionSpec::Plain)
                .with(
                    FeatureKind::Core,
                    CORE_STRICT_ATTRIBUTE_ISSUER_MATCH,
                    ExtensionSpec::Plain,
                )
                .with(
                    FeatureKind::Datatype,
                    "urn:pap:feature:datatype:dns-name",
                    ExtensionSpec::Plain,
                )
                .with(
                    FeatureKind::Datatype,
                    "urn:pap:feature:datatype:ip-address",
                    ExtensionSpec::Plain,
                )
                .with(
                    FeatureKind::Function,
                    "urn:pap:feature:function:dns-name-value-equal",
                    ExtensionSpec::Plain,
                )
                .with(
                    FeatureKind::Function,
                    "urn:pap:feature:function:ip-address-value-equal",
                    ExtensionSpec::Plain,
                )
                .with(
                    FeatureKind::CombiningAlgorithm,
                    "urn:pap:feature:combining-algorithm:ordered-deny-overrides",
                    ExtensionSpec::Plain,
                )
                .with(
                    FeatureKind::CombiningAlgorithm,
                    "urn:pap:feature:combining-algorithm:ordered-permit-overrides",
                    ExtensionSpec::Plain,
                )
                .with(
                    FeatureKind::RequestPreproc,
                    XML_SINGLE_REQUEST_PREPROC,
                    ExtensionSpec::RequestPreproc {
                        input: "xml",
                        output: "individual-xml",
                    },
                )
                .with(
                    FeatureKind::RequestPreproc,
                    XML_MULTIPLE_REQUEST_PREPROC,
                    ExtensionSpec::RequestPreproc {
                        input: "xml",
                        output: "individual-xml",
                    },
                )
                .with(
                    FeatureKind::RequestPreproc,
                    JSON_SINGLE_REQUEST_PREPROC,
                    ExtensionSpec::RequestPreproc {
                        input: "json",
                        output: "individual-json",
                    },
                )
                .with(
                    FeatureKind::ResultPostproc,
                    XML_COMBINED_RESULT_POSTPROC,
                    ExtensionSpec::ResultPostproc {
                        input: "individual-xml",
                    },
                )
                .with(
                    FeatureKind::ResultPostproc,
                    JSON_COMBINED_RESULT_POSTPROC,
                    ExtensionSpec::ResultPostproc {
                        input: "individual-json",
                    },
                )
        })
    }

    pub fn with(mut self, kind: FeatureKind, id: &str, spec: ExtensionSpec) -> Self {
        self.entries
            .entry(kind)
            .or_default()
            .insert(id.to_string(), spec);
        self
    }

    /// Look up a feature, failing with the list of valid IDs
    pub fn lookup(&self, kind: FeatureKind, id: &str) -> PapResult<&ExtensionSpec> {
        self.entries
            .get(&kind)
            .and_then(|ids| ids.get(id))
            .ok_or_else(|| {
                let expected: Vec<&str> = self.ids(kind).collect();
                PapError::invalid(format!(
                    "invalid {kind} feature: '{id}'. Expected one of {expected:?}"
                ))
            })
    }

    pub fn ids(&self, kind: FeatureKind) -> impl Iterator<Item = &str> {
        self.entries
            .get(&kind)
            .into_iter()
            .flat_map(|ids| ids.keys().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
