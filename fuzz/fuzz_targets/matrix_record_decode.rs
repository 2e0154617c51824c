#![no_main]

use libfuzzer_sys::fuzz_target;
use mrcluster::{MatrixCodec, RecordCodec};

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        let _ = MatrixCodec.decode(line);
    }
});
