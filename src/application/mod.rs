//! Application Layer
//!
//! Orchestrates the domain model and the file-backed repositories:
//!
//! - [`EngineLifecycle`] - builds, swaps and closes the engine of one domain
//! - [`DomainHandle`] - administrative operations on one domain
//! - [`DomainRegistry`] - creation, lookup, removal and reconciliation of
//!   all domains under a root directory
//!
//! Background reconciliation runs one thread per domain (see `sync_task`).

pub mod domain;
pub mod engine_lifecycle;
pub mod registry;
mod sync_task;

pub use domain::{DomainHandle, DomainSyncOutcome};
pub use engine_lifecycle::{ConfigSource, EngineLifecycle, LoadedEngine, SharedEngine};
pub use registry::{DomainRegistry, RegistrySettings, DOMAIN_DIR_MAX_DEPTH};
