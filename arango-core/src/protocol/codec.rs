//! Codec implementation for chunked protocol messages.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use super::chunk::Chunk;
use super::constants::*;
use crate::error::{ArangoError, Result};

/// A complete message: an id plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message id shared by request and response.
    pub id: u64,
    /// Packed envelope header followed by the packed body.
    pub payload: Bytes,
}

impl Message {
    /// Creates a message.
    pub fn new(id: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}

/// Chunks received so far for one message.
#[derive(Debug)]
struct PartialMessage {
    count: u32,
    received: u32,
    length: u64,
    data: BytesMut,
}

/// Codec for encoding and decoding chunked messages.
///
/// Implements the `tokio_util::codec::{Encoder, Decoder}` traits for use
/// with tokio's framed I/O. Outbound messages larger than the chunk size are
/// split; inbound chunks of different messages may interleave and are
/// reassembled per message id.
#[derive(Debug)]
pub struct VstCodec {
    chunk_size: usize,
    /// Messages whose chunks are still being accumulated.
    partial: HashMap<u64, PartialMessage>,
}

impl VstCodec {
    /// Creates a codec with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates a codec that splits messages into chunks of at most `chunk_size` bytes.
    ///
    /// Values below [`MIN_CHUNK_SIZE`] are raised to it.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(MIN_CHUNK_SIZE),
            partial: HashMap::new(),
        }
    }

    /// Returns the configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the number of messages currently being reassembled.
    pub fn pending_messages(&self) -> usize {
        self.partial.len()
    }

    fn accept(&mut self, chunk: Chunk) -> Result<Option<Message>> {
        if chunk.message_length > MAX_MESSAGE_SIZE {
            return Err(ArangoError::Protocol(format!(
                "message {} announces {} bytes, limit is {}",
                chunk.message_id, chunk.message_length, MAX_MESSAGE_SIZE
            )));
        }

        if let Some(count) = chunk.count() {
            if count == 0 {
                return Err(ArangoError::Protocol(format!(
                    "message {} announces zero chunks",
                    chunk.message_id
                )));
            }
            if count == 1 {
                if chunk.content.len() as u64 != chunk.message_length {
                    return Err(ArangoError::Protocol(format!(
                        "single-chunk message {} carries {} of {} bytes",
                        chunk.message_id,
                        chunk.content.len(),
                        chunk.message_length
                    )));
                }
                return Ok(Some(Message::new(chunk.message_id, chunk.content)));
            }
            if self.partial.contains_key(&chunk.message_id) {
                return Err(ArangoError::Protocol(format!(
                    "message {} started twice",
                    chunk.message_id
                )));
            }
            let mut data = BytesMut::with_capacity(chunk.message_length as usize);
            data.extend_from_slice(&chunk.content);
            self.partial.insert(
                chunk.message_id,
                PartialMessage {
                    count,
                    received: 1,
                    length: chunk.message_length,
                    data,
                },
            );
            return Ok(None);
        }

        let partial = self.partial.get_mut(&chunk.message_id).ok_or_else(|| {
            ArangoError::Protocol(format!(
                "follow-up chunk for unknown message {}",
                chunk.message_id
            ))
        })?;
        if chunk.index() != partial.received {
            return Err(ArangoError::Protocol(format!(
                "message {} expected chunk {}, got {}",
                chunk.message_id,
                partial.received,
                chunk.index()
            )));
        }
        partial.data.extend_from_slice(&chunk.content);
        partial.received += 1;

        if (partial.data.len() as u64) > partial.length {
            return Err(ArangoError::Protocol(format!(
                "message {} exceeds its announced length {}",
                chunk.message_id, partial.length
            )));
        }

        if partial.received < partial.count {
            return Ok(None);
        }

        match self.partial.remove(&chunk.message_id) {
            Some(done) if done.data.len() as u64 == done.length => {
                trace!(
                    message_id = chunk.message_id,
                    chunks = done.count,
                    bytes = done.length,
                    "reassembled chunked message"
                );
                Ok(Some(Message::new(chunk.message_id, done.data.freeze())))
            }
            Some(done) => Err(ArangoError::Protocol(format!(
                "message {} reassembled to {} of {} bytes",
                chunk.message_id,
                done.data.len(),
                done.length
            ))),
            None => Ok(None),
        }
    }
}

impl Default for VstCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<Message> for VstCodec {
    type Error = ArangoError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let piece = self.chunk_size - CHUNK_HEADER_SIZE;
        let total = item.payload.len();
        let count = total.div_ceil(piece).max(1);
        let count = u32::try_from(count).map_err(|_| {
            ArangoError::Protocol(format!("message of {} bytes needs too many chunks", total))
        })?;

        let mut offset = 0;
        for index in 0..count {
            let end = (offset + piece).min(total);
            let content = item.payload.slice(offset..end);
            let chunk = if index == 0 {
                Chunk::first(count, item.id, total as u64, content)
            } else {
                Chunk::follow(index, item.id, total as u64, content)
            };
            chunk.write_to(dst);
            offset = end;
        }
        Ok(())
    }
}

impl Decoder for VstCodec {
    type Item = Message;
    type Error = ArangoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let Some(chunk) = Chunk::read_from(src)? else {
                return Ok(None);
            };
            if let Some(message) = self.accept(chunk)? {
                return Ok(Some(message));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if !src.is_empty() {
            return Err(ArangoError::Protocol(format!(
                "stream ended inside a chunk ({} bytes buffered)",
                src.len()
            )));
        }
        if !self.partial.is_empty() {
            return Err(ArangoError::Protocol(format!(
                "stream ended with {} incomplete messages",
                self.partial.len()
            )));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut codec = VstCodec::new();
        let original = Message::new(1, payload(100));

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), CHUNK_HEADER_SIZE + 100);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_large_message_is_split() {
        let mut codec = VstCodec::with_chunk_size(64);
        let original = Message::new(9, payload(200));

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        // 40 bytes of payload per chunk
        assert_eq!(buf.len(), 5 * CHUNK_HEADER_SIZE + 200);
        assert_eq!(&buf[4..8], &[11, 0, 0, 0]);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_payload_is_one_chunk() {
        let mut codec = VstCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Message::new(3, Bytes::new()), &mut buf).unwrap();
        assert_eq!(buf.len(), CHUNK_HEADER_SIZE);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.id, 3);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_interleaved_messages_reassemble() {
        let mut writer = VstCodec::with_chunk_size(64);
        let mut a = BytesMut::new();
        let mut b = BytesMut::new();
        writer.encode(Message::new(1, payload(80)), &mut a).unwrap();
        writer.encode(Message::new(2, payload(80)), &mut b).unwrap();

        let a_chunks: Vec<BytesMut> = (0..2).map(|_| a.split_to(64)).collect();
        let b_first = b.split_to(64);

        let mut wire = BytesMut::new();
        wire.extend_from_slice(&a_chunks[0]);
        wire.extend_from_slice(&b_first);
        wire.extend_from_slice(&a_chunks[1]);
        wire.extend_from_slice(&a);
        wire.extend_from_slice(&b);

        let mut reader = VstCodec::new();
        let first = reader.decode(&mut wire).unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.payload, payload(80));
        let second = reader.decode(&mut wire).unwrap().unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(reader.pending_messages(), 0);
    }

    #[test]
    fn test_decode_multiple_messages() {
        let mut codec = VstCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Message::new(1, payload(5)), &mut buf).unwrap();
        codec.encode(Message::new(2, payload(7)), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().id, 1);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().id, 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_partial_chunk_waits() {
        let mut codec = VstCodec::new();
        let mut full = BytesMut::new();
        codec.encode(Message::new(1, payload(50)), &mut full).unwrap();

        let mut buf = full.split_to(30);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&full);
        assert!(codec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_eof_inside_chunk_is_protocol_error() {
        let mut codec = VstCodec::new();
        let mut full = BytesMut::new();
        codec.encode(Message::new(1, payload(50)), &mut full).unwrap();

        let mut buf = full.split_to(30);
        let result = codec.decode_eof(&mut buf);
        assert!(matches!(result, Err(ArangoError::Protocol(_))));
    }

    #[test]
    fn test_eof_with_incomplete_message_is_protocol_error() {
        let mut writer = VstCodec::with_chunk_size(64);
        let mut full = BytesMut::new();
        writer.encode(Message::new(1, payload(100)), &mut full).unwrap();

        let mut buf = full.split_to(64);
        let mut reader = VstCodec::new();
        assert!(reader.decode(&mut buf).unwrap().is_none());
        let result = reader.decode_eof(&mut buf);
        assert!(matches!(result, Err(ArangoError::Protocol(_))));
    }

    #[test]
    fn test_clean_eof() {
        let mut codec = VstCodec::new();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_orphan_follow_chunk_rejected() {
        let mut buf = BytesMut::new();
        Chunk::follow(1, 5, 10, Bytes::from_static(b"abc")).write_to(&mut buf);

        let mut codec = VstCodec::new();
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ArangoError::Protocol(_))
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut buf = BytesMut::new();
        Chunk::first(1, 5, 10, Bytes::from_static(b"abc")).write_to(&mut buf);

        let mut codec = VstCodec::new();
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ArangoError::Protocol(_))
        ));
    }

    #[test]
    fn test_chunk_size_floor() {
        assert_eq!(VstCodec::with_chunk_size(1).chunk_size(), MIN_CHUNK_SIZE);
    }
}
