//! Scenario: Policy Count Quota
//!
//! Journey: an administrator limits a domain to one policy besides its root.
//!
//! Steps:
//! 1. Set max_policy_count so that a single slot is left next to the root
//! 2. Add P1: succeeds
//! 3. Add P2: fails, the quota is reached
//! 4. Remove P1 (not used by the engine)
//! 5. Add P2: succeeds
//!
//! Success Criteria:
//! - The quota is never exceeded
//! - Failed additions leave nothing on disk

use crate::common::*;
use pap_flatfile::domain::entities::PrpProperties;
use pap_flatfile::{ErrorKind, PapError};

#[test]
fn scenario_single_free_policy_slot() {
    let repo = TestRepo::new();
    let domain = repo.create_domain_with(Some("quota"), None);
    let dir = repo.domain_dir(domain.domain_id());

    // the root policy occupies one slot
    domain
        .set_prp_properties(PrpProperties {
            max_policy_count: Some(2),
            ..PrpProperties::default()
        })
        .unwrap();

    domain.add_policy(policy("P1", "1")).unwrap();

    let err = domain.add_policy(policy("P2", "1")).unwrap_err();
    assert!(matches!(err, PapError::TooManyPolicies { max: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(!store(&dir).policy_dir("P2").exists());

    assert_eq!(domain.remove_policy("P1").unwrap(), vec![v("1")]);

    domain.add_policy(policy("P2", "1")).unwrap();
    let ids = domain.list_policy_ids().unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains("P2"));
    assert!(!ids.contains("P1"));
}

#[test]
fn scenario_version_quota_with_rolling() {
    let repo = TestRepo::new();
    let domain = repo.create_domain();
    domain
        .set_prp_properties(PrpProperties {
            max_policy_count: None,
            max_version_count_per_policy: Some(3),
            version_rolling_enabled: true,
        })
        .unwrap();

    for minor in 1..=10 {
        domain.add_policy(policy(ROOT, &format!("1.{minor}"))).unwrap();
        let count = domain.list_versions(ROOT).unwrap().len();
        assert!(count <= 3, "{count} versions stored after 1.{minor}");
        assert_eq!(
            domain.engine().unwrap().root_policy().version,
            v(&format!("1.{minor}"))
        );
    }

    let kept: Vec<String> = domain
        .list_versions(ROOT)
        .unwrap()
        .oldest_to_latest()
        .map(|v| v.to_string())
        .collect();
    assert_eq!(kept, vec!["1.8", "1.9", "1.10"]);
}
