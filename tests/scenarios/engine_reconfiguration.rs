//! Scenario: Engine Reconfiguration
//!
//! Journey: an administrator builds a policy tree, then points the engine at
//! a root that does not exist, then at a valid one.
//!
//! Success Criteria:
//! - The failed reconfiguration changes neither the engine nor `pdp.toml`
//! - The valid one swaps the engine and frees the previous tree

use std::fs;
use std::sync::Arc;

use crate::common::*;
use pap_flatfile::domain::entities::{PolicyRef, WritablePdpProperties};
use pap_flatfile::ErrorKind;

fn root(policy_ref: PolicyRef) -> WritablePdpProperties {
    WritablePdpProperties {
        root_policy_ref: policy_ref,
        features: Vec::new(),
    }
}

#[test]
fn scenario_reconfigure_engine_root() {
    let repo = TestRepo::new();
    let domain = repo.create_domain_with(Some("reconfigured"), Some("tenant-a"));
    let config_path = pdp_config_path(&repo.domain_dir(domain.domain_id()));

    domain.add_policy(policy("leaf", "1")).unwrap();
    domain.add_policy(root_referencing("2", "leaf")).unwrap();
    let serving = domain.engine().unwrap();
    assert_eq!(serving.applicable_policies().len(), 2);
    let config_before = fs::read_to_string(&config_path).unwrap();

    // 1. root pointing nowhere
    let err = domain
        .set_pdp_properties(root(PolicyRef::latest("does-not-exist")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineBuildFailed);
    assert!(Arc::ptr_eq(&serving, &domain.engine().unwrap()));
    assert!(!serving.is_closed());
    assert_eq!(fs::read_to_string(&config_path).unwrap(), config_before);
    assert_eq!(
        domain.get_pdp_properties().unwrap().root_policy_ref_expression,
        PolicyRef::latest(ROOT)
    );

    // 2. leaf is still protected by the serving engine
    assert_eq!(domain.remove_policy("leaf").unwrap_err().kind(), ErrorKind::Conflict);

    // 3. valid root
    domain.add_policy(policy("standalone", "1")).unwrap();
    let props = domain
        .set_pdp_properties(root(PolicyRef::latest("standalone")))
        .unwrap();
    assert_eq!(
        props.applicable_root_policy_ref,
        PolicyRef::exact("standalone", v("1"))
    );
    assert!(props.other_applicable_policy_refs.is_empty());
    assert!(serving.is_closed());
    assert_ne!(fs::read_to_string(&config_path).unwrap(), config_before);

    // 4. the old tree is no longer protected
    assert_eq!(domain.remove_policy("leaf").unwrap(), vec![v("1")]);
    assert_eq!(domain.remove_policy(ROOT).unwrap(), vec![v("1"), v("2")]);
}
