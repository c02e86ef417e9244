#![no_main]

use libfuzzer_sys::fuzz_target;
use litekv_codec::{detect_mode, Codec, EncryptionKey};

fuzz_target!(|data: &[u8]| {
    let _ = detect_mode(data);

    // Neither codec may panic on arbitrary input
    let plain = Codec::plain();
    if let Ok(map) = plain.decode(data) {
        let _ = plain.encode(&map);
    }

    if let Ok(key) = EncryptionKey::from_bytes(&[7u8; 32]) {
        let _ = Codec::encrypted(key).decode(data);
    }
});
