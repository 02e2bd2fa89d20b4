//! Property tests for persisted domain properties.

use proptest::prelude::*;

use pap_flatfile::domain::entities::{DomainProperties, PrpProperties};
use pap_flatfile::infrastructure::TomlPropertiesRepository;

fn quota() -> impl Strategy<Value = Option<u32>> {
    prop_oneof![Just(None), Just(Some(0)), (1u32..50).prop_map(Some)]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a zero quota always reads back as unlimited.
    #[test]
    fn property_zero_quota_means_unlimited(
        max_policies in quota(),
        max_versions in quota(),
        rolling in any::<bool>(),
    ) {
        let mut props = DomainProperties::default();
        props.apply_prp(&PrpProperties {
            max_policy_count: max_policies,
            max_version_count_per_policy: max_versions,
            version_rolling_enabled: rolling,
        });
        let prp = props.prp();
        prop_assert_eq!(prp.max_policy_count, max_policies.filter(|&m| m > 0));
        prop_assert_eq!(prp.max_version_count_per_policy, max_versions.filter(|&m| m > 0));
        prop_assert_eq!(prp.version_rolling_enabled, rolling);
    }

    /// PROPERTY: whatever text is stored as description or externalId is
    /// read back unchanged from `properties.toml`.
    #[test]
    fn property_properties_file_preserves_text(
        description in proptest::option::of("\\PC{0,40}"),
        external_id in proptest::option::of("[A-Za-z0-9:_./-]{1,40}"),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let repo = TomlPropertiesRepository::new();
        let props = DomainProperties {
            description,
            external_id,
            ..DomainProperties::default()
        };
        repo.save(dir.path(), &props).unwrap();
        prop_assert_eq!(repo.load(dir.path()).unwrap(), props);
    }
}
