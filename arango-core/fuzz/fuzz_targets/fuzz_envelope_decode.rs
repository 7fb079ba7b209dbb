#![no_main]

use libfuzzer_sys::fuzz_target;

use arango_core::protocol::{decode_incoming, decode_response, encode_request, Incoming};

fuzz_target!(|data: &[u8]| {
    let _ = decode_response(data);

    if let Ok(Incoming::Request(request)) = decode_incoming(data) {
        let _ = encode_request(&request, &[]);
        let _ = request.to_string();
    }
});
