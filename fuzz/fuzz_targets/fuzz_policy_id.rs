#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        // directory names found on disk are untrusted
        let _ = pap_flatfile::decode_policy_id(name);

        let encoded = pap_flatfile::encode_policy_id(name);
        assert_eq!(pap_flatfile::decode_policy_id(&encoded).ok().as_deref(), Some(name));
    }
});
