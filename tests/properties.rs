//! Property tests for pap-flatfile.
//!
//! Properties use randomized input generation to explore edge cases and
//! protect invariants like "never panics" and "orders consistently".
//!
//! Run with: `cargo test --test properties`

#[path = "properties/policy_id.rs"]
mod policy_id;

#[path = "properties/policy_version.rs"]
mod policy_version;

#[path = "properties/domain_properties.rs"]
mod domain_properties;
