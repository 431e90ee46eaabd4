#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(specs) = merlin_mongo::translate::parse_sort_json(s) {
            let native = merlin_mongo::translate::translate_sort(Some(specs.as_slice()));
            assert_eq!(native.map_or(0, |n| n.len()), specs.len());
        }
    }
});
