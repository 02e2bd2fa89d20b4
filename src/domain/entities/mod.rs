//! Domain Entities
//!
//! - `DomainProperties` - content of a domain's `properties.toml`
//! - `PdpConfig` - content of a domain's `pdp.toml`
//! - `PolicyDocument` - one version of a policy

mod domain_properties;
mod pdp_config;
mod policy_document;

pub use domain_properties::{
    DomainProperties, PrpProperties, ReadableDomainProperties, WritableDomainProperties,
};
pub use pdp_config::{
    validate_attribute_providers, AttributeProviderConfig, IoProcChain, PdpConfig, PdpProperties,
    PolicyRef, PolicyStoreConfig, WritablePdpProperties,
};
pub use policy_document::{PolicyDocument, PolicyMetadata};
