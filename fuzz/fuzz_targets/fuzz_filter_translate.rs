#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(filter) = merlin_mongo::translate::parse_filter_json(s) {
            // Translation must be pure: two runs agree, success or failure.
            let a = merlin_mongo::translate::translate_filter(&filter);
            let b = merlin_mongo::translate::translate_filter(&filter);
            assert_eq!(a.is_ok(), b.is_ok());
            if let (Ok(a), Ok(b)) = (a, b) {
                assert_eq!(a, b);
            }
        }
    }
});
