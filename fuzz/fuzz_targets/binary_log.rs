#![no_main]

use execlog::binary_log;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match binary_log::decode_log(data) {
        // Whatever decoded must survive a round trip unchanged
        Ok(spawns) => {
            let reencoded = binary_log::encode_log(&spawns);
            assert_eq!(binary_log::decode_log(&reencoded).ok(), Some(spawns));
        }
        Err(err) => assert!(err.offset().is_some_and(|offset| offset <= data.len())),
    }
});
