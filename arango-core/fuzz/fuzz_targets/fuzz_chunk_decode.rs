#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;

use arango_core::protocol::VstCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = VstCodec::with_chunk_size(64);
    let mut buf = BytesMut::from(data);

    loop {
        match codec.decode(&mut buf) {
            Ok(Some(msg)) => {
                let _ = msg.id;
                let _ = msg.payload.len();
            }
            Ok(None) => break,
            Err(_) => return,
        }
    }

    let _ = codec.decode_eof(&mut buf);
});
