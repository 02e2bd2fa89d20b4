#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(props) = toml::from_str::<pap_flatfile::domain::entities::DomainProperties>(content) {
            let _ = props.prp();
        }
    }
});
