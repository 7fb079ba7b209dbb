#![no_main]

use libfuzzer_sys::fuzz_target;

use arango_core::document::pack;

fuzz_target!(|data: &[u8]| {
    if let Ok(doc) = pack::decode(data) {
        let encoded = pack::encode(&doc).expect("decoded documents must re-encode");
        let again = pack::decode(&encoded).expect("re-encoded documents must decode");
        assert_eq!(pack::encode(&again).ok(), Some(encoded));
    }
});
