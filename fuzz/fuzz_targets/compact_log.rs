#![no_main]

use execlog::compact_log;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // entries reference each other by id; dangling ids must not panic
    if let Ok(spawns) = compact_log::decode_log(data) {
        assert!(spawns.len() <= data.len());
    }
});
