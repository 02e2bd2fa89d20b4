//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod domain_id;
mod feature;
mod policy_id;
mod policy_version;

pub use domain_id::{generate_domain_id, is_valid_domain_dir_name, DOMAIN_ID_LEN};
pub use feature::{
    ExtensionSpec, FeatureCatalog, FeatureKind, PdpFeature, CORE_STRICT_ATTRIBUTE_ISSUER_MATCH,
    CORE_XPATH_EVAL, JSON_COMBINED_RESULT_POSTPROC, JSON_SINGLE_REQUEST_PREPROC,
    XML_COMBINED_RESULT_POSTPROC, XML_MULTIPLE_REQUEST_PREPROC, XML_SINGLE_REQUEST_PREPROC,
};
pub use policy_id::{decode_policy_id, encode_policy_id};
pub use policy_version::{PolicyVersion, VERSION_DELIMITER};
