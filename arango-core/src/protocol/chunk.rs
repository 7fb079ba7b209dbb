//! Chunk type for the chunked message protocol.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::constants::*;
use crate::error::{ArangoError, Result};

/// A single chunk of a message.
///
/// Each chunk consists of:
/// - a 4-byte chunk length, header included (little-endian)
/// - a 4-byte `chunk_x` descriptor (little-endian)
/// - an 8-byte message id (little-endian)
/// - an 8-byte total message length (little-endian)
/// - the payload slice
///
/// `chunk_x` is `(count << 1) | 1` on the first chunk of a message and
/// `index << 1` on every following chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk descriptor.
    pub chunk_x: u32,
    /// Id of the message this chunk belongs to.
    pub message_id: u64,
    /// Length of the complete message payload.
    pub message_length: u64,
    /// Slice of the message payload.
    pub content: Bytes,
}

impl Chunk {
    /// Creates the first chunk of a message split into `count` chunks.
    pub fn first(count: u32, message_id: u64, message_length: u64, content: Bytes) -> Self {
        Self {
            chunk_x: (count << 1) | 1,
            message_id,
            message_length,
            content,
        }
    }

    /// Creates the follow-up chunk at position `index`.
    pub fn follow(index: u32, message_id: u64, message_length: u64, content: Bytes) -> Self {
        Self {
            chunk_x: index << 1,
            message_id,
            message_length,
            content,
        }
    }

    /// Returns true if this is the first chunk of its message.
    pub fn is_first(&self) -> bool {
        self.chunk_x & 1 == 1
    }

    /// Chunk count announced by a first chunk.
    pub fn count(&self) -> Option<u32> {
        self.is_first().then_some(self.chunk_x >> 1)
    }

    /// Position of this chunk within its message.
    pub fn index(&self) -> u32 {
        if self.is_first() {
            0
        } else {
            self.chunk_x >> 1
        }
    }

    /// Returns the size of this chunk on the wire.
    pub fn wire_size(&self) -> usize {
        CHUNK_HEADER_SIZE + self.content.len()
    }

    /// Writes this chunk to the given buffer.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        dst.put_u32_le(self.wire_size() as u32);
        dst.put_u32_le(self.chunk_x);
        dst.put_u64_le(self.message_id);
        dst.put_u64_le(self.message_length);
        dst.put_slice(&self.content);
    }

    /// Reads a chunk from the given buffer.
    ///
    /// Returns `Ok(None)` if there isn't enough data for a complete chunk, and
    /// a protocol error if the length field is impossible.
    pub fn read_from(src: &mut BytesMut) -> Result<Option<Self>> {
        if src.len() < SIZE_OF_CHUNK_LENGTH_FIELD {
            return Ok(None);
        }

        let chunk_length = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if chunk_length < CHUNK_HEADER_SIZE {
            return Err(ArangoError::Protocol(format!(
                "chunk length {} is smaller than the chunk header",
                chunk_length
            )));
        }
        if chunk_length as u64 > CHUNK_HEADER_SIZE as u64 + MAX_MESSAGE_SIZE {
            return Err(ArangoError::Protocol(format!(
                "chunk length {} exceeds the maximum message size {}",
                chunk_length, MAX_MESSAGE_SIZE
            )));
        }

        if src.len() < chunk_length {
            src.reserve(chunk_length - src.len());
            return Ok(None);
        }

        src.advance(SIZE_OF_CHUNK_LENGTH_FIELD);
        let chunk_x = src.get_u32_le();
        let message_id = src.get_u64_le();
        let message_length = src.get_u64_le();
        let content = src.split_to(chunk_length - CHUNK_HEADER_SIZE).freeze();

        Ok(Some(Self {
            chunk_x,
            message_id,
            message_length,
            content,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_chunk_descriptor() {
        let chunk = Chunk::first(3, 7, 100, Bytes::from_static(b"abc"));
        assert_eq!(chunk.chunk_x, 7);
        assert!(chunk.is_first());
        assert_eq!(chunk.count(), Some(3));
        assert_eq!(chunk.index(), 0);
    }

    #[test]
    fn test_follow_chunk_descriptor() {
        let chunk = Chunk::follow(2, 7, 100, Bytes::from_static(b"abc"));
        assert_eq!(chunk.chunk_x, 4);
        assert!(!chunk.is_first());
        assert_eq!(chunk.count(), None);
        assert_eq!(chunk.index(), 2);
    }

    #[test]
    fn test_write_layout() {
        let chunk = Chunk::first(1, 0x0102, 2, Bytes::from_static(&[0xAA, 0xBB]));
        let mut buf = BytesMut::new();
        chunk.write_to(&mut buf);

        assert_eq!(buf.len(), 26);
        assert_eq!(&buf[0..4], &[26, 0, 0, 0]);
        assert_eq!(&buf[4..8], &[3, 0, 0, 0]);
        assert_eq!(&buf[8..16], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&buf[16..24], &[2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&buf[24..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_write_and_read_chunk() {
        let original = Chunk::follow(5, 99, 4096, Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]));
        let mut buf = BytesMut::new();
        original.write_to(&mut buf);

        assert_eq!(buf.len(), original.wire_size());

        let decoded = Chunk::read_from(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_read_incomplete_length() {
        let mut buf = BytesMut::from(&[0x01, 0x02][..]);
        assert!(Chunk::read_from(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_read_incomplete_content() {
        let chunk = Chunk::first(1, 1, 10, Bytes::from(vec![0u8; 10]));
        let mut full = BytesMut::new();
        chunk.write_to(&mut full);

        let mut buf = BytesMut::from(&full[..full.len() - 3]);
        assert!(Chunk::read_from(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), full.len() - 3);
    }

    #[test]
    fn test_read_impossible_length() {
        let mut buf = BytesMut::from(&[0x08, 0x00, 0x00, 0x00, 0, 0, 0, 0][..]);
        let result = Chunk::read_from(&mut buf);
        assert!(matches!(result, Err(ArangoError::Protocol(_))));
    }

    #[test]
    fn test_read_oversized_length_fails_before_reserving() {
        let mut buf = BytesMut::from(&[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0][..]);
        let capacity = buf.capacity();
        let result = Chunk::read_from(&mut buf);
        assert!(matches!(result, Err(ArangoError::Protocol(_))));
        assert_eq!(buf.capacity(), capacity);
    }

    #[test]
    fn test_read_empty_payload() {
        let chunk = Chunk::first(1, 42, 0, Bytes::new());
        let mut buf = BytesMut::new();
        chunk.write_to(&mut buf);

        let decoded = Chunk::read_from(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.message_id, 42);
        assert!(decoded.content.is_empty());
    }
}
