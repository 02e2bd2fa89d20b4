//! Error types for the policy repository
//!
//! Every variant maps onto one [`ErrorKind`] so callers (e.g. an API layer)
//! can translate failures without matching on individual variants.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repository operations
pub type PapResult<T> = Result<T, PapError>;

/// Coarse error category exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, quota violation, externalId conflict
    InvalidArgument,
    /// Unknown or removed domain
    NotFound,
    /// Concurrent creation collision or still-in-use deletion attempt
    Conflict,
    /// Filesystem read/write/delete failure or unreadable persisted file
    StorageIo,
    /// Configuration or policy set rejected by the engine builder
    EngineBuildFailed,
    /// Domain engine is in the fatal error state
    EngineInError,
    /// Operation disabled by the deployment mode
    Disabled,
}

/// Main error type for repository operations
#[derive(Error, Debug)]
pub enum PapError {
    /// Generic invalid argument
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Policy version string is not a dot-separated list of integers
    #[error("invalid policy version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Policy directory name is not a valid encoded policy ID
    #[error("invalid policy directory name '{encoded}': {reason}")]
    InvalidPolicyId { encoded: String, reason: String },

    /// Adding a new policy would exceed the domain's policy quota
    #[error("max number of policies ({max}) reached for domain '{domain_id}'")]
    TooManyPolicies { domain_id: String, max: u32 },

    /// Adding a version would exceed the policy's version quota
    #[error("max number of versions ({max}) reached for policy '{policy_id}' and none can be removed")]
    TooManyVersions { policy_id: String, max: u32 },

    /// externalId already bound to another domain
    #[error("externalId conflict: '{external_id}' cannot be associated with domain '{domain_id}' because already associated with '{bound_to}'")]
    ExternalIdConflict {
        external_id: String,
        domain_id: String,
        bound_to: String,
    },

    /// Unknown domain
    #[error("domain not found: {domain_id}")]
    DomainNotFound { domain_id: String },

    /// Generated domain ID collides with a live domain
    #[error("generated domain ID '{domain_id}' conflicts with an existing domain")]
    DomainIdCollision { domain_id: String },

    /// Attempt to delete a policy (version) the engine still uses
    #[error("policy '{policy_id}' (version {version}) cannot be removed because it is still used by the PDP, either as root policy or referenced directly/indirectly by the root policy")]
    StillInUse { policy_id: String, version: String },

    /// Filesystem operation failure
    #[error("failed to {op} '{path}': {source}")]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted file exists but cannot be parsed
    #[error("corrupted file '{path}': {message}")]
    Corrupted { path: PathBuf, message: String },

    /// In-memory object cannot be serialized
    #[error("failed to serialize {what}: {message}")]
    Serialization { what: &'static str, message: String },

    /// Engine builder rejected the configuration or policy set
    #[error("domain '{domain_id}': PDP engine build failed: {message}")]
    EngineBuildFailed { domain_id: String, message: String },

    /// Engine cannot enumerate its applicable policies statically
    #[error("domain '{domain_id}': some policies are not statically resolved (dynamic policy resolution is not supported)")]
    NonStaticPolicySet { domain_id: String },

    /// Engine in fatal error state
    #[error("domain '{domain_id}': PDP in error state. Check the server logs or contact the administrator")]
    EngineInError { domain_id: String },

    /// Operation disabled by configuration
    #[error("unsupported operation '{operation}': disabled by configuration")]
    Disabled { operation: &'static str },
}

impl PapError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PapError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn storage(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PapError::Storage {
            op,
            path: path.into(),
            source,
        }
    }

    /// Taxonomy category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PapError::InvalidArgument { .. }
            | PapError::InvalidVersion { .. }
            | PapError::InvalidPolicyId { .. }
            | PapError::TooManyPolicies { .. }
            | PapError::TooManyVersions { .. }
            | PapError::ExternalIdConflict { .. } => ErrorKind::InvalidArgument,
            PapError::DomainNotFound { .. } => ErrorKind::NotFound,
            PapError::DomainIdCollision { .. } | PapError::StillInUse { .. } => ErrorKind::Conflict,
            PapError::Storage { .. } | PapError::Corrupted { .. } | PapError::Serialization { .. } => {
                ErrorKind::StorageIo
            }
            PapError::EngineBuildFailed { .. } | PapError::NonStaticPolicySet { .. } => {
                ErrorKind::EngineBuildFailed
            }
            PapError::EngineInError { .. } => ErrorKind::EngineInError,
            PapError::Disabled { .. } => ErrorKind::Disabled,
        }
    }
}
