//! Repository configuration
//!
//! Resolution order:
//! 1. Environment variables (`PAP_*`, highest priority)
//! 2. Explicit config file
//! 3. User config (`<config dir>/pap/config.toml`)
//! 4. Built-in defaults

mod loader;
#[cfg(test)]
mod tests;
mod types;

pub use loader::ConfigWarning;
pub use types::{RepositoryConfig, ServiceConfig, StorageConfig, SyncConfig};
