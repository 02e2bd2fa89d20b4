#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        if let Ok(version) = pap_flatfile::PolicyVersion::parse(raw) {
            assert_eq!(version.to_string(), raw);
        }
    }
});
