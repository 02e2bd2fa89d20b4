//! Decision engine port
//!
//! The repository never evaluates decisions itself. It asks an
//! [`EngineBuilder`] for a fresh [`PolicyEngine`] whenever the configuration
//! or the referenced policies change, and only needs the engine to report
//! which policy versions it statically depends on.

use std::path::Path;

use crate::domain::entities::{PdpConfig, PolicyDocument, PolicyMetadata};
use crate::domain::value_objects::{FeatureCatalog, PolicyVersion};
use crate::error::PapError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration or policy set rejected
    #[error("{message}")]
    Invalid { message: String },

    /// Policy documents could not be read
    #[error(transparent)]
    Source(#[from] PapError),

    /// Releasing engine resources failed
    #[error("failed to close engine: {message}")]
    Close { message: String },
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::Invalid {
            message: message.into(),
        }
    }
}

/// Read access to the policy versions of a domain
pub trait PolicySource {
    fn latest_version(&self, policy_id: &str) -> Result<Option<PolicyVersion>, PapError>;

    fn read_version(
        &self,
        policy_id: &str,
        version: &PolicyVersion,
    ) -> Result<Option<PolicyDocument>, PapError>;
}

/// Everything a builder needs to compile a domain's engine
pub struct EngineBuildRequest<'a> {
    pub domain_id: &'a str,
    pub domain_dir: &'a Path,
    pub config: &'a PdpConfig,
    pub policies: &'a dyn PolicySource,
}

/// A compiled decision engine
pub trait PolicyEngine: Send + Sync {
    /// Root policy first, then every policy it references directly or
    /// indirectly; `None` if the set cannot be enumerated statically.
    fn applicable_policies(&self) -> Option<Vec<PolicyMetadata>>;

    /// Release engine resources; called exactly once
    fn close(&self) -> Result<(), EngineError>;
}

/// Factory of decision engines
pub trait EngineBuilder: Send + Sync {
    fn build(&self, request: &EngineBuildRequest<'_>) -> Result<Box<dyn PolicyEngine>, EngineError>;

    /// Features this builder understands
    fn feature_catalog(&self) -> &FeatureCatalog {
        FeatureCatalog::builtin()
    }
}
