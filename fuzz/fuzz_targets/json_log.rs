#![no_main]

use execlog::json_log;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = json_log::decode_log(data);
});
