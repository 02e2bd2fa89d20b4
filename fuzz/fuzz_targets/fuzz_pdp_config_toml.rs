#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // pdp.toml may be edited by hand
        let _ = toml::from_str::<pap_flatfile::domain::entities::PdpConfig>(content);
    }
});
