//! Typed decoding of packed documents.
//!
//! [`DocumentDeserializer`] drives any `serde::Deserialize` type from a
//! [`Document`], applying the driver's decoding rules:
//!
//! - missing struct fields decode as if they were `null`;
//! - `null` decodes to the target's zero value (`0`, `""`, `false`, empty
//!   collections, `None`, a struct of zero fields);
//! - unknown fields are skipped unless [`DecodeOptions::strict`] is set;
//! - integers widen freely, and narrowing that would lose information fails;
//! - object keys are matched against field names through a [`FieldNaming`]
//!   convention.

use std::fmt;
use std::vec;

use chrono::SecondsFormat;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};

use super::Document;
use crate::error::{ArangoError, Result};

impl de::Error for ArangoError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ArangoError::Codec(msg.to_string())
    }
}

/// How server-side object keys relate to Rust field names.
#[derive(Clone, Copy, Default)]
pub enum FieldNaming {
    /// Keys must equal field names.
    AsIs,
    /// Keys are the lowerCamelCase form of snake_case field names. Exact matches still apply.
    #[default]
    CamelCase,
    /// Keys are produced from field names by a custom function. Exact matches still apply.
    Custom(fn(&str) -> String),
}

impl FieldNaming {
    /// Returns the key a field is expected under.
    pub fn key_for(&self, field: &str) -> String {
        match self {
            FieldNaming::AsIs => field.to_string(),
            FieldNaming::CamelCase => snake_to_camel(field),
            FieldNaming::Custom(f) => f(field),
        }
    }

    fn resolve(&self, key: &str, fields: &'static [&'static str]) -> Option<&'static str> {
        if let Some(field) = fields.iter().find(|f| **f == key) {
            return Some(*field);
        }
        match self {
            FieldNaming::AsIs => None,
            _ => fields.iter().find(|f| self.key_for(f) == key).copied(),
        }
    }
}

impl fmt::Debug for FieldNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldNaming::AsIs => f.write_str("AsIs"),
            FieldNaming::CamelCase => f.write_str("CamelCase"),
            FieldNaming::Custom(_) => f.write_str("Custom"),
        }
    }
}

fn snake_to_camel(field: &str) -> String {
    let leading = field.len() - field.trim_start_matches('_').len();
    let mut out = String::with_capacity(field.len());
    out.push_str(&field[..leading]);
    let mut upper = false;
    for c in field[leading..].chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Options for typed decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Field naming convention.
    pub naming: FieldNaming,
    /// Reject object keys that match no struct field.
    pub strict: bool,
}

impl DecodeOptions {
    /// Creates lenient camelCase options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the naming convention.
    pub fn naming(mut self, naming: FieldNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Enables or disables strict field checking.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Decodes a document into `T` with default options.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T> {
    from_document_with(doc, &DecodeOptions::default())
}

/// Decodes a document into `T` with the given options.
pub fn from_document_with<T: DeserializeOwned>(doc: Document, options: &DecodeOptions) -> Result<T> {
    T::deserialize(DocumentDeserializer::new(doc, options))
}

/// A `serde::Deserializer` over an owned [`Document`].
#[derive(Debug)]
pub struct DocumentDeserializer<'a> {
    value: Document,
    options: &'a DecodeOptions,
}

impl<'a> DocumentDeserializer<'a> {
    /// Wraps a document.
    pub fn new(value: Document, options: &'a DecodeOptions) -> Self {
        Self { value, options }
    }

    fn invalid(&self, expected: &str) -> ArangoError {
        ArangoError::Codec(format!(
            "invalid type: {}, expected {}",
            self.value.type_name(),
            expected
        ))
    }

    fn integer<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Null => visitor.visit_i64(0),
            Document::Int(i) => visitor.visit_i64(i),
            Document::UInt(u) => visitor.visit_u64(u),
            Document::Double(f) if f.is_finite() && f.fract() == 0.0 => {
                if f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 {
                    visitor.visit_i64(f as i64)
                } else if f >= 0.0 && f < 18_446_744_073_709_551_616.0 {
                    visitor.visit_u64(f as u64)
                } else {
                    Err(ArangoError::Codec(format!("{} does not fit an integer", f)))
                }
            }
            Document::Double(f) => Err(ArangoError::Codec(format!(
                "narrowing {} to an integer loses information",
                f
            ))),
            _ => Err(self.invalid("integer")),
        }
    }
}

impl<'de, 'a> de::Deserializer<'de> for DocumentDeserializer<'a> {
    type Error = ArangoError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let options = self.options;
        match self.value {
            Document::Null => visitor.visit_unit(),
            Document::Bool(b) => visitor.visit_bool(b),
            Document::Int(i) => visitor.visit_i64(i),
            Document::UInt(u) => visitor.visit_u64(u),
            Document::Double(f) => visitor.visit_f64(f),
            Document::String(s) => visitor.visit_string(s),
            Document::Binary(b) => visitor.visit_byte_buf(b),
            Document::Date(d) => visitor.visit_string(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Document::Array(items) => visitor.visit_seq(SeqDeserializer::new(items, options)),
            Document::Object(entries) => visitor.visit_map(MapDeserializer::new(entries, options)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Null => visitor.visit_bool(false),
            Document::Bool(b) => visitor.visit_bool(b),
            _ => Err(self.invalid("bool")),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.integer(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Double(f) if f.is_finite() && f64::from(f as f32) != f => Err(
                ArangoError::Codec(format!("narrowing {} to f32 loses information", f)),
            ),
            Document::Double(f) => visitor.visit_f32(f as f32),
            _ => self.deserialize_f64(visitor),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Null => visitor.visit_f64(0.0),
            Document::Double(f) => visitor.visit_f64(f),
            Document::Int(i) => visitor.visit_f64(i as f64),
            Document::UInt(u) => visitor.visit_f64(u as f64),
            _ => Err(self.invalid("double")),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Null => visitor.visit_char('\0'),
            Document::String(s) => visitor.visit_string(s),
            _ => Err(self.invalid("char")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Null => visitor.visit_str(""),
            Document::String(s) => visitor.visit_string(s),
            Document::Date(d) => visitor.visit_string(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            _ => Err(self.invalid("string")),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let options = self.options;
        match self.value {
            Document::Null => visitor.visit_byte_buf(Vec::new()),
            Document::Binary(b) => visitor.visit_byte_buf(b),
            Document::String(s) => visitor.visit_byte_buf(s.into_bytes()),
            Document::Array(items) => visitor.visit_seq(SeqDeserializer::new(items, options)),
            _ => Err(self.invalid("bytes")),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Document::Null => visitor.visit_unit(),
            _ if !self.options.strict => visitor.visit_unit(),
            _ => Err(self.invalid("null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let options = self.options;
        match self.value {
            Document::Null => visitor.visit_seq(SeqDeserializer::new(Vec::new(), options)),
            Document::Array(items) => visitor.visit_seq(SeqDeserializer::new(items, options)),
            Document::Binary(bytes) => visitor.visit_seq(SeqDeserializer::new(
                bytes.into_iter().map(Document::from).collect(),
                options,
            )),
            _ => Err(self.invalid("array")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let options = self.options;
        match self.value {
            Document::Null => visitor.visit_map(MapDeserializer::new(Vec::new(), options)),
            Document::Object(entries) => visitor.visit_map(MapDeserializer::new(entries, options)),
            _ => Err(self.invalid("object")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let options = self.options;
        let entries = match self.value {
            Document::Null => Vec::new(),
            Document::Object(entries) => entries,
            _ => return Err(self.invalid("object")),
        };

        let mut resolved: Vec<(String, Document)> = Vec::with_capacity(fields.len().max(entries.len()));
        let mut seen = vec![false; fields.len()];
        for (key, value) in entries {
            match options.naming.resolve(&key, fields) {
                Some(field) => {
                    if let Some(index) = fields.iter().position(|f| *f == field) {
                        seen[index] = true;
                    }
                    resolved.push((field.to_string(), value));
                }
                None if options.strict => return Err(de::Error::unknown_field(&key, fields)),
                None => resolved.push((key, value)),
            }
        }
        for (field, present) in fields.iter().zip(seen) {
            if !present {
                resolved.push((field.to_string(), Document::Null));
            }
        }

        visitor.visit_map(MapDeserializer::new(resolved, options))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let options = self.options;
        match self.value {
            Document::String(variant) => visitor.visit_enum(variant.into_deserializer()),
            Document::Object(mut entries) if entries.len() == 1 => {
                let (variant, value) = entries.remove(0);
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value,
                    options,
                })
            }
            _ => Err(self.invalid("enum variant")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

impl<'de, 'a> IntoDeserializer<'de, ArangoError> for DocumentDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

struct SeqDeserializer<'a> {
    iter: vec::IntoIter<Document>,
    options: &'a DecodeOptions,
}

impl<'a> SeqDeserializer<'a> {
    fn new(items: Vec<Document>, options: &'a DecodeOptions) -> Self {
        Self {
            iter: items.into_iter(),
            options,
        }
    }
}

impl<'de, 'a> SeqAccess<'de> for SeqDeserializer<'a> {
    type Error = ArangoError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some(value) => seed
                .deserialize(DocumentDeserializer::new(value, self.options))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer<'a> {
    iter: vec::IntoIter<(String, Document)>,
    value: Option<Document>,
    options: &'a DecodeOptions,
}

impl<'a> MapDeserializer<'a> {
    fn new(entries: Vec<(String, Document)>, options: &'a DecodeOptions) -> Self {
        Self {
            iter: entries.into_iter(),
            value: None,
            options,
        }
    }
}

impl<'de, 'a> MapAccess<'de> for MapDeserializer<'a> {
    type Error = ArangoError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self
            .value
            .take()
            .ok_or_else(|| ArangoError::Codec("map value requested before key".to_string()))?;
        seed.deserialize(DocumentDeserializer::new(value, self.options))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer<'a> {
    variant: String,
    value: Document,
    options: &'a DecodeOptions,
}

impl<'de, 'a> EnumAccess<'de> for EnumDeserializer<'a> {
    type Error = ArangoError;
    type Variant = DocumentDeserializer<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant =
            seed.deserialize(de::value::StringDeserializer::<ArangoError>::new(self.variant))?;
        Ok((variant, DocumentDeserializer::new(self.value, self.options)))
    }
}

impl<'de, 'a> VariantAccess<'de> for DocumentDeserializer<'a> {
    type Error = ArangoError;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_struct(self, "", fields, visitor)
    }
}
