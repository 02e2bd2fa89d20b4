//! Property tests for policy ID to directory name encoding.

use proptest::prelude::*;

use pap_flatfile::{decode_policy_id, encode_policy_id, ErrorKind};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: any policy ID survives the trip through its directory name.
    #[test]
    fn property_policy_id_is_recoverable(id in "\\PC{0,64}") {
        let encoded = encode_policy_id(&id);
        prop_assert_eq!(decode_policy_id(&encoded).unwrap(), id);
    }

    /// PROPERTY: encoded names are a single, portable path segment.
    #[test]
    fn property_encoded_name_is_portable(id in "\\PC{1,64}") {
        let encoded = encode_policy_id(&id);
        prop_assert!(!encoded.is_empty());
        prop_assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    /// PROPERTY: distinct IDs never share a directory.
    #[test]
    fn property_encoding_is_injective(a in "\\PC{0,32}", b in "\\PC{0,32}") {
        prop_assume!(a != b);
        prop_assert_ne!(encode_policy_id(&a), encode_policy_id(&b));
    }

    /// PROPERTY: decoding arbitrary names fails cleanly instead of panicking.
    #[test]
    fn property_decode_never_panics(name in "(?s).{0,64}") {
        if let Err(err) = decode_policy_id(&name) {
            prop_assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }
}
