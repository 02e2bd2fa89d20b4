//! pap-flatfile - filesystem-backed policy administration point
//!
//! Stores authorization policy domains as plain directories: domain
//! properties, engine configuration and immutable versioned policies. Each
//! domain keeps a compiled decision engine in memory, rebuilt whenever its
//! configuration or policies change, on disk or through the API.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pap_flatfile::{DomainRegistry, RepositoryConfig, StaticRefEngineBuilder};
//! use pap_flatfile::domain::entities::WritableDomainProperties;
//!
//! # fn main() -> pap_flatfile::PapResult<()> {
//! let settings = RepositoryConfig::load_or_default(None).settings()?;
//! let registry = DomainRegistry::open(settings, Arc::new(StaticRefEngineBuilder::new()))?;
//! let domain_id = registry.create_domain(WritableDomainProperties::new(Some("demo"), None))?;
//! let domain = registry.get(&domain_id)?.expect("just created");
//! println!("root policy: {:?}", domain.applicable_policy_refs()?.first());
//! registry.close();
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use application::{DomainHandle, DomainRegistry, DomainSyncOutcome, RegistrySettings};
pub use config::{ConfigWarning, RepositoryConfig};
pub use domain::value_objects::{decode_policy_id, encode_policy_id, PolicyVersion};
pub use error::{ErrorKind, PapError, PapResult};
pub use infrastructure::StaticRefEngineBuilder;
