#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(delta) = merlin_mongo::translate::parse_delta_json(s) {
            if let Ok(native) = merlin_mongo::translate::translate_delta(&delta) {
                assert!(!native.contains_key("$pull"));
            }
        }
    }
});
