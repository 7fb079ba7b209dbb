//! Self-describing packed documents.
//!
//! A [`Document`] is the in-memory form of every request and response body.
//! Objects keep their keys in insertion order, and that order survives a trip
//! over the wire. The binary form is MessagePack (see [`pack`]); typed access
//! goes through [`from_document`] and [`to_document`].

mod de;
pub mod pack;

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ArangoError, Result};

pub use de::{from_document, from_document_with, DecodeOptions, DocumentDeserializer, FieldNaming};

/// A packed document value.
///
/// Integers are stored as `Int` or `UInt`; both compare equal when they denote
/// the same number, since the wire format only keeps the smallest encoding.
#[derive(Debug, Clone, Default)]
pub enum Document {
    /// The null value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A double precision float.
    Double(f64),
    /// A UTF-8 string.
    String(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// A UTC timestamp.
    Date(DateTime<Utc>),
    /// An ordered list of values.
    Array(Vec<Document>),
    /// String-keyed entries in insertion order.
    Object(Vec<(String, Document)>),
}

impl Document {
    /// Creates an empty object.
    pub fn object() -> Self {
        Document::Object(Vec::new())
    }

    /// Creates an empty array.
    pub fn array() -> Self {
        Document::Array(Vec::new())
    }

    /// Creates a binary value.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Document::Binary(bytes.into())
    }

    /// Appends or replaces an object entry, keeping the original position on replace.
    ///
    /// Non-object documents are left untouched.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Document>) {
        if let Document::Object(entries) = self {
            let key = key.into();
            let value = value.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Document>) -> Self {
        self.insert(key, value);
        self
    }

    /// Appends to an array. Non-array documents are left untouched.
    pub fn push(&mut self, value: impl Into<Document>) {
        if let Document::Array(items) = self {
            items.push(value.into());
        }
    }

    /// Looks up an object entry.
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Removes an object entry and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<Document> {
        match self {
            Document::Object(entries) => {
                let index = entries.iter().position(|(k, _)| k == key)?;
                Some(entries.remove(index).1)
            }
            _ => None,
        }
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }

    /// Returns the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Document::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `i64` when it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Document::Int(i) => Some(*i),
            Document::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Returns the value as `u64` when it fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Document::Int(i) => u64::try_from(*i).ok(),
            Document::UInt(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Document::Int(i) => Some(*i as f64),
            Document::UInt(u) => Some(*u as f64),
            Document::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the array items, if this is an array.
    pub fn as_array(&self) -> Option<&[Document]> {
        match self {
            Document::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the object entries, if this is an object.
    pub fn as_object(&self) -> Option<&[(String, Document)]> {
        match self {
            Document::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns a short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "bool",
            Document::Int(_) | Document::UInt(_) => "integer",
            Document::Double(_) => "double",
            Document::String(_) => "string",
            Document::Binary(_) => "binary",
            Document::Date(_) => "date",
            Document::Array(_) => "array",
            Document::Object(_) => "object",
        }
    }

    /// Converts to a JSON value. Binary becomes an array of numbers, dates become RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Document::Null => serde_json::Value::Null,
            Document::Bool(b) => serde_json::Value::Bool(*b),
            Document::Int(i) => serde_json::Value::from(*i),
            Document::UInt(u) => serde_json::Value::from(*u),
            Document::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Document::String(s) => serde_json::Value::String(s.clone()),
            Document::Binary(b) => {
                serde_json::Value::Array(b.iter().map(|x| serde_json::Value::from(*x)).collect())
            }
            Document::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Document::Array(items) => {
                serde_json::Value::Array(items.iter().map(Document::to_json).collect())
            }
            Document::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Serializes any value into a [`Document`], keeping struct field order.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<Document> {
    serde_json::to_value(value)
        .map(Document::from)
        .map_err(|e| ArangoError::Codec(format!("failed to serialize value: {}", e)))
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        use Document::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Int(a), UInt(b)) | (UInt(b), Int(a)) => u64::try_from(*a).map_or(false, |a| a == *b),
            (Double(a), Double(b)) => a == b || a.to_bits() == b.to_bits(),
            (String(a), String(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Document {
            fn from(v: $t) -> Self {
                Document::Int(i64::from(v))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Document {
            fn from(v: $t) -> Self {
                Document::UInt(u64::from(v))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<bool> for Document {
    fn from(v: bool) -> Self {
        Document::Bool(v)
    }
}

impl From<f32> for Document {
    fn from(v: f32) -> Self {
        Document::Double(f64::from(v))
    }
}

impl From<f64> for Document {
    fn from(v: f64) -> Self {
        Document::Double(v)
    }
}

impl From<&str> for Document {
    fn from(v: &str) -> Self {
        Document::String(v.to_string())
    }
}

impl From<String> for Document {
    fn from(v: String) -> Self {
        Document::String(v)
    }
}

impl From<DateTime<Utc>> for Document {
    fn from(v: DateTime<Utc>) -> Self {
        Document::Date(v)
    }
}

impl From<Vec<Document>> for Document {
    fn from(v: Vec<Document>) -> Self {
        Document::Array(v)
    }
}

impl<T: Into<Document>> From<Option<T>> for Document {
    fn from(v: Option<T>) -> Self {
        v.map_or(Document::Null, Into::into)
    }
}

impl FromIterator<(String, Document)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Document)>>(iter: I) -> Self {
        Document::Object(iter.into_iter().collect())
    }
}

impl FromIterator<Document> for Document {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Document::Array(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Document {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Document::Null,
            serde_json::Value::Bool(b) => Document::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Document::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Document::Int(i)
                } else {
                    Document::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Document::String(s),
            serde_json::Value::Array(items) => {
                Document::Array(items.into_iter().map(Document::from).collect())
            }
            serde_json::Value::Object(map) => {
                Document::Object(map.into_iter().map(|(k, v)| (k, Document::from(v))).collect())
            }
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Document::Null => serializer.serialize_unit(),
            Document::Bool(b) => serializer.serialize_bool(*b),
            Document::Int(i) => serializer.serialize_i64(*i),
            Document::UInt(u) => serializer.serialize_u64(*u),
            Document::Double(f) => serializer.serialize_f64(*f),
            Document::String(s) => serializer.serialize_str(s),
            Document::Binary(b) => serializer.serialize_bytes(b),
            Document::Date(d) => {
                serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Document::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Document::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any packed document value")
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Document, E> {
        Ok(Document::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Document, E> {
        Ok(Document::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Document, E> {
        Ok(Document::UInt(v))
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Document, E> {
        Ok(Document::Double(v))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Document, E> {
        Ok(Document::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Document, E> {
        Ok(Document::String(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Document, E> {
        Ok(Document::Binary(v.to_vec()))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Document, E> {
        Ok(Document::Binary(v))
    }

    fn visit_none<E>(self) -> std::result::Result<Document, E> {
        Ok(Document::Null)
    }

    fn visit_unit<E>(self) -> std::result::Result<Document, E> {
        Ok(Document::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Document, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Document, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Document::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Document, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<String, Document>()? {
            entries.push((k, v));
        }
        Ok(Document::Object(entries))
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(DocumentVisitor)
    }
}
