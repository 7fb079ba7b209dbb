//! Binary form of [`Document`]s.
//!
//! Documents are packed as MessagePack. Encoding always uses the most compact
//! marker for integers and lengths, so the output is deterministic. Dates use
//! the timestamp extension (type -1) in its 96-bit layout; the 32 and 64-bit
//! layouts are accepted on decode.

use chrono::{DateTime, Utc};
use rmp::Marker;

use super::Document;
use crate::error::{ArangoError, Result};

/// MessagePack extension type reserved for timestamps.
pub const TIMESTAMP_EXT_TYPE: i8 = -1;

/// Packs a document into a fresh buffer.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(64);
    encode_into(doc, &mut buf)?;
    Ok(buf)
}

/// Appends the packed form of a document to `buf`.
pub fn encode_into(doc: &Document, buf: &mut Vec<u8>) -> Result<()> {
    match doc {
        Document::Null => rmp::encode::write_nil(buf).map_err(write_error)?,
        Document::Bool(b) => rmp::encode::write_bool(buf, *b).map_err(write_error)?,
        Document::Int(i) => {
            rmp::encode::write_sint(buf, *i).map_err(write_error)?;
        }
        Document::UInt(u) => {
            rmp::encode::write_uint(buf, *u).map_err(write_error)?;
        }
        Document::Double(f) => rmp::encode::write_f64(buf, *f).map_err(write_error)?,
        Document::String(s) => rmp::encode::write_str(buf, s).map_err(write_error)?,
        Document::Binary(b) => rmp::encode::write_bin(buf, b).map_err(write_error)?,
        Document::Date(d) => {
            rmp::encode::write_ext_meta(buf, 12, TIMESTAMP_EXT_TYPE).map_err(write_error)?;
            buf.extend_from_slice(&d.timestamp_subsec_nanos().to_be_bytes());
            buf.extend_from_slice(&d.timestamp().to_be_bytes());
        }
        Document::Array(items) => {
            rmp::encode::write_array_len(buf, length(items.len())?).map_err(write_error)?;
            for item in items {
                encode_into(item, buf)?;
            }
        }
        Document::Object(entries) => {
            rmp::encode::write_map_len(buf, length(entries.len())?).map_err(write_error)?;
            for (key, value) in entries {
                rmp::encode::write_str(buf, key).map_err(write_error)?;
                encode_into(value, buf)?;
            }
        }
    }
    Ok(())
}

/// Unpacks exactly one document; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    let (doc, consumed) = decode_prefix(bytes)?;
    if consumed != bytes.len() {
        return Err(ArangoError::Codec(format!(
            "{} trailing bytes after packed document",
            bytes.len() - consumed
        )));
    }
    Ok(doc)
}

/// Unpacks the first document in `bytes` and returns it with the number of bytes consumed.
pub fn decode_prefix(bytes: &[u8]) -> Result<(Document, usize)> {
    let mut reader = Reader { bytes, pos: 0 };
    let doc = reader.read_document(0)?;
    Ok((doc, reader.pos))
}

/// Nesting limit for arrays and objects on decode.
const MAX_DEPTH: usize = 512;

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                ArangoError::Codec(format!(
                    "malformed packed document: truncated at offset {}",
                    self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_document(&mut self, depth: usize) -> Result<Document> {
        let offset = self.pos;
        Ok(match Marker::from_u8(self.u8()?) {
            Marker::Null => Document::Null,
            Marker::True => Document::Bool(true),
            Marker::False => Document::Bool(false),
            Marker::FixPos(n) => Document::UInt(u64::from(n)),
            Marker::FixNeg(n) => Document::Int(i64::from(n)),
            Marker::U8 => Document::UInt(u64::from(self.u8()?)),
            Marker::U16 => Document::UInt(u64::from(self.u16()?)),
            Marker::U32 => Document::UInt(u64::from(self.u32()?)),
            Marker::U64 => Document::UInt(self.u64()?),
            Marker::I8 => signed(i64::from(self.u8()? as i8)),
            Marker::I16 => signed(i64::from(self.u16()? as i16)),
            Marker::I32 => signed(i64::from(self.u32()? as i32)),
            Marker::I64 => signed(self.u64()? as i64),
            Marker::F32 => Document::Double(f64::from(f32::from_bits(self.u32()?))),
            Marker::F64 => Document::Double(f64::from_bits(self.u64()?)),
            Marker::FixStr(n) => self.string(usize::from(n))?,
            Marker::Str8 => {
                let len = usize::from(self.u8()?);
                self.string(len)?
            }
            Marker::Str16 => {
                let len = usize::from(self.u16()?);
                self.string(len)?
            }
            Marker::Str32 => {
                let len = self.u32()? as usize;
                self.string(len)?
            }
            Marker::Bin8 => {
                let len = usize::from(self.u8()?);
                Document::Binary(self.take(len)?.to_vec())
            }
            Marker::Bin16 => {
                let len = usize::from(self.u16()?);
                Document::Binary(self.take(len)?.to_vec())
            }
            Marker::Bin32 => {
                let len = self.u32()? as usize;
                Document::Binary(self.take(len)?.to_vec())
            }
            Marker::FixArray(n) => self.items(usize::from(n), depth)?,
            Marker::Array16 => {
                let len = usize::from(self.u16()?);
                self.items(len, depth)?
            }
            Marker::Array32 => {
                let len = self.u32()? as usize;
                self.items(len, depth)?
            }
            Marker::FixMap(n) => self.entries(usize::from(n), depth)?,
            Marker::Map16 => {
                let len = usize::from(self.u16()?);
                self.entries(len, depth)?
            }
            Marker::Map32 => {
                let len = self.u32()? as usize;
                self.entries(len, depth)?
            }
            Marker::FixExt1 => self.ext(1)?,
            Marker::FixExt2 => self.ext(2)?,
            Marker::FixExt4 => self.ext(4)?,
            Marker::FixExt8 => self.ext(8)?,
            Marker::FixExt16 => self.ext(16)?,
            Marker::Ext8 => {
                let len = usize::from(self.u8()?);
                self.ext(len)?
            }
            Marker::Ext16 => {
                let len = usize::from(self.u16()?);
                self.ext(len)?
            }
            Marker::Ext32 => {
                let len = self.u32()? as usize;
                self.ext(len)?
            }
            Marker::Reserved => {
                return Err(ArangoError::Codec(format!(
                    "malformed packed document: reserved marker 0xc1 at offset {}",
                    offset
                )))
            }
        })
    }

    fn string(&mut self, len: usize) -> Result<Document> {
        let raw = self.take(len)?;
        let s = std::str::from_utf8(raw)
            .map_err(|_| ArangoError::Codec("string is not valid UTF-8".to_string()))?;
        Ok(Document::String(s.to_string()))
    }

    fn items(&mut self, len: usize, depth: usize) -> Result<Document> {
        self.descend(depth)?;
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(self.read_document(depth + 1)?);
        }
        Ok(Document::Array(items))
    }

    fn entries(&mut self, len: usize, depth: usize) -> Result<Document> {
        self.descend(depth)?;
        let mut object = Vec::with_capacity(len.min(self.remaining() / 2));
        for _ in 0..len {
            let key = match self.read_document(depth + 1)? {
                Document::String(s) => s,
                other => {
                    return Err(ArangoError::Codec(format!(
                        "object keys must be strings, found {}",
                        other.type_name()
                    )))
                }
            };
            object.push((key, self.read_document(depth + 1)?));
        }
        Ok(Document::Object(object))
    }

    fn ext(&mut self, len: usize) -> Result<Document> {
        let ext_type = self.u8()? as i8;
        let data = self.take(len)?;
        if ext_type != TIMESTAMP_EXT_TYPE {
            return Err(ArangoError::Codec(format!(
                "unsupported extension type {}",
                ext_type
            )));
        }
        Ok(Document::Date(decode_timestamp(data)?))
    }

    fn descend(&self, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(ArangoError::Codec(format!(
                "packed document nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }
}

/// Non-negative values of the signed markers decode as unsigned, matching fixint.
fn signed(value: i64) -> Document {
    match u64::try_from(value) {
        Ok(u) => Document::UInt(u),
        Err(_) => Document::Int(value),
    }
}

fn decode_timestamp(data: &[u8]) -> Result<DateTime<Utc>> {
    let (secs, nanos) = match data.len() {
        4 => (i64::from(u32::from_be_bytes(fixed(data, 0)?)), 0),
        8 => {
            let packed = u64::from_be_bytes(fixed(data, 0)?);
            ((packed & 0x0000_0003_ffff_ffff) as i64, (packed >> 34) as u32)
        }
        12 => (
            i64::from_be_bytes(fixed(data, 4)?),
            u32::from_be_bytes(fixed(data, 0)?),
        ),
        n => {
            return Err(ArangoError::Codec(format!(
                "timestamp extension has invalid length {}",
                n
            )))
        }
    };
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| ArangoError::Codec(format!("timestamp out of range: {}s", secs)))
}

fn fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    data.get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| ArangoError::Codec("truncated timestamp extension".to_string()))
}

fn length(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| ArangoError::Codec(format!("container of {} items is too large", len)))
}

fn write_error<E: std::fmt::Display>(e: E) -> ArangoError {
    ArangoError::Codec(format!("failed to pack document: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Document {
        Document::object()
            .with("null", Document::Null)
            .with("yes", true)
            .with("small", 7u8)
            .with("negative", -42i32)
            .with("big", u64::MAX)
            .with("min", i64::MIN)
            .with("ratio", 1.25f64)
            .with("name", "zürich")
            .with("raw", Document::binary(vec![0u8, 1, 2, 255]))
            .with(
                "when",
                Utc.with_ymd_and_hms(2020, 2, 29, 12, 30, 15).unwrap(),
            )
            .with(
                "list",
                Document::Array(vec![1.into(), "two".into(), Document::object().with("z", 1)]),
            )
    }

    #[test]
    fn test_roundtrip_preserves_values_and_key_order() {
        let original = sample();
        let bytes = encode(&original).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, original);

        let keys: Vec<_> = decoded
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect();
        let expected: Vec<_> = original
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode(&sample()).unwrap();
        let b = encode(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_integers_use_fixint() {
        assert_eq!(encode(&Document::UInt(5)).unwrap(), vec![0x05]);
        assert_eq!(encode(&Document::Int(-1)).unwrap(), vec![0xff]);
        assert_eq!(encode(&Document::Null).unwrap(), vec![0xc0]);
    }

    #[test]
    fn test_date_uses_timestamp96() {
        let date = Utc.timestamp_opt(1_600_000_000, 500).unwrap();
        let bytes = encode(&Document::Date(date)).unwrap();
        assert_eq!(bytes[0], 0xc7);
        assert_eq!(bytes[1], 12);
        assert_eq!(bytes[2] as i8, TIMESTAMP_EXT_TYPE);
        assert_eq!(decode(&bytes).unwrap(), Document::Date(date));
    }

    #[test]
    fn test_decode_timestamp32() {
        let bytes = [0xd6, 0xff, 0x00, 0x00, 0x00, 0x3c];
        let doc = decode(&bytes).unwrap();
        assert_eq!(doc, Document::Date(Utc.timestamp_opt(60, 0).unwrap()));
    }

    #[test]
    fn test_decode_prefix_reports_consumed() {
        let mut bytes = encode(&Document::from("header")).unwrap();
        let header_len = bytes.len();
        bytes.extend(encode(&Document::from(1)).unwrap());

        let (doc, consumed) = decode_prefix(&bytes).unwrap();
        assert_eq!(doc, Document::from("header"));
        assert_eq!(consumed, header_len);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(&Document::from(true)).unwrap();
        bytes.push(0xc0);
        assert!(matches!(decode(&bytes), Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_truncated_document_rejected() {
        let bytes = encode(&sample()).unwrap();
        let result = decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_non_string_key_rejected() {
        // fixmap with one entry {1: 2}
        let bytes = [0x81, 0x01, 0x02];
        assert!(matches!(decode(&bytes), Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_reserved_marker_rejected() {
        assert!(matches!(decode(&[0xc1]), Err(ArangoError::Codec(_))));
        // [nil, 0xc1] nested inside an array
        let bytes = [0x92, 0xc0, 0xc1];
        assert!(matches!(decode(&bytes), Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_oversized_length_rejected_without_allocating() {
        // array32 claiming u32::MAX items with no payload
        let bytes = [0xdd, 0xff, 0xff, 0xff, 0xff];
        assert!(matches!(decode(&bytes), Err(ArangoError::Codec(_))));
        // str32 claiming u32::MAX bytes
        let bytes = [0xdb, 0xff, 0xff, 0xff, 0xff, b'a'];
        assert!(matches!(decode(&bytes), Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_excessive_nesting_rejected() {
        let bytes = vec![0x91u8; MAX_DEPTH + 1];
        assert!(matches!(decode(&bytes), Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_wide_integer_markers_decode() {
        // int8 -1, int16 300, uint32 70000, float32 1.5
        assert_eq!(decode(&[0xd0, 0xff]).unwrap(), Document::Int(-1));
        assert_eq!(decode(&[0xd1, 0x01, 0x2c]).unwrap(), Document::UInt(300));
        assert_eq!(
            decode(&[0xce, 0x00, 0x01, 0x11, 0x70]).unwrap(),
            Document::UInt(70_000)
        );
        assert_eq!(
            decode(&[0xca, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            Document::Double(1.5)
        );
    }

    #[test]
    fn test_unknown_extension_rejected() {
        // fixext1 type 5
        let bytes = [0xd4, 0x05, 0x00];
        assert!(matches!(decode(&bytes), Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_generated_documents_roundtrip() {
        // Deterministic pseudo-random generator, so failures are reproducible.
        let mut seed = 0x2545_f491_4f6c_dd1du64;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        fn build(next: &mut dyn FnMut() -> u64, depth: u32) -> Document {
            let pick = if depth == 0 { next() % 7 } else { next() % 9 };
            match pick {
                0 => Document::Null,
                1 => Document::Bool(next() % 2 == 0),
                2 => Document::Int(-(next() as i64 & 0xffff_ffff) - 1),
                3 => Document::UInt(next()),
                4 => Document::Double((next() % 10_000) as f64 / 7.0),
                5 => Document::String(format!("s{}", next() % 1000)),
                6 => Document::binary(((next() % 250) as u8..=250u8).collect::<Vec<u8>>()),
                7 => (0..next() % 5).map(|_| build(next, depth - 1)).collect(),
                _ => (0..next() % 5)
                    .map(|i| (format!("k{}_{}", i, next() % 100), build(next, depth - 1)))
                    .collect(),
            }
        }

        for _ in 0..200 {
            let doc = build(&mut next, 4);
            let bytes = encode(&doc).unwrap();
            assert_eq!(decode(&bytes).unwrap(), doc);
        }
    }
}
