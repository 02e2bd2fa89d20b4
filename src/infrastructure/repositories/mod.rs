//! Repository Implementations
//!
//! Per-domain persisted state: `properties.toml`, `pdp.toml` and the policy
//! version files.

mod pdp_config;
mod policy_store;
mod properties;
mod toml_file;

pub use pdp_config::{TomlPdpConfigRepository, PDP_CONFIG_FILE_NAME};
pub use policy_store::{AddedVersion, PolicyVersionStore, PolicyVersions};
pub use properties::{TomlPropertiesRepository, PROPERTIES_FILE_NAME};
