//! Property tests for policy version parsing and ordering.

use std::cmp::Ordering;

use proptest::prelude::*;

use pap_flatfile::infrastructure::repositories::PolicyVersions;
use pap_flatfile::PolicyVersion;

fn version_string() -> impl Strategy<Value = String> {
    proptest::collection::vec(0u64..1000, 1..=5).prop_map(|segments| {
        segments
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    })
}

fn version() -> impl Strategy<Value = PolicyVersion> {
    version_string().prop_map(|s| PolicyVersion::parse(&s).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: parsing never panics, whatever the input.
    #[test]
    fn property_parse_never_panics(raw in "(?s).{0,48}") {
        let _ = PolicyVersion::parse(&raw);
    }

    /// PROPERTY: well-formed versions parse and keep their spelling.
    #[test]
    fn property_well_formed_versions_parse(raw in version_string()) {
        let parsed = PolicyVersion::parse(&raw).unwrap();
        prop_assert_eq!(parsed.to_string(), raw);
    }

    /// PROPERTY: the order is antisymmetric and agrees with equality.
    #[test]
    fn property_order_is_antisymmetric(a in version(), b in version()) {
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
    }

    /// PROPERTY: the order is transitive.
    #[test]
    fn property_order_is_transitive(a in version(), b in version(), c in version()) {
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
    }

    /// PROPERTY: appending a segment never makes a version older.
    #[test]
    fn property_longer_version_is_not_older(base in version_string(), extra in 0u64..1000) {
        let short = PolicyVersion::parse(&base).unwrap();
        let long = PolicyVersion::parse(&format!("{base}.{extra}")).unwrap();
        prop_assert!(long > short);
    }

    /// PROPERTY: a version listing is sorted and its latest is the maximum.
    #[test]
    fn property_listing_latest_is_maximum(versions in proptest::collection::vec(version(), 1..16)) {
        let max = versions.iter().max().cloned();
        let listing = PolicyVersions::new(versions);
        prop_assert_eq!(listing.latest().cloned(), max);
        let sorted: Vec<_> = listing.oldest_to_latest().collect();
        prop_assert!(sorted.windows(2).all(|w| w[0] < w[1]));
    }
}
