#![no_main]
use libfuzzer_sys::fuzz_target;
use merlin_mongo::driver::mem::MemoryCollection;
use merlin_mongo::driver::{CollectionHandle, ReadWindow};

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(filter) = merlin_mongo::translate::parse_filter_json(s) else { return };
    let Ok(native) = merlin_mongo::translate::translate_filter(&filter) else { return };
    let col = MemoryCollection::new("fuzz");
    futures::executor::block_on(async {
        // A tiny fixed data set to exercise the evaluation paths
        for d in [
            bson::doc! {"a": 1, "b": 2, "name": "x"},
            bson::doc! {"a": 10, "b": -5, "name": "y", "nested": {"z": 3}, "tags": ["p", "q"]},
            bson::doc! {"active": true},
        ] {
            let _ = col.insert(d).await;
        }
        if let Ok(n) = col.count(native, ReadWindow::default()).await {
            assert!(n <= 3);
        }
    });
});
