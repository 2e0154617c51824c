#![no_main]

use libfuzzer_sys::fuzz_target;
use mrcluster::{PointCodec, RecordCodec};

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        if let Ok((id, coords)) = PointCodec.decode(line) {
            let encoded = PointCodec.encode(&id, &coords);
            assert_eq!(PointCodec.decode(&encoded).ok(), Some((id, coords)));
        }
    }
});
