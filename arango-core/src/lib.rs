//! Core types and protocols for the multi-model database driver.
//!
//! This crate has no I/O of its own: it defines the error type, the packed
//! [`Document`] model with typed decoding, and the chunked wire codec used by
//! `arango-client`.

pub mod document;
pub mod error;
pub mod protocol;

pub use document::{
    from_document, from_document_with, to_document, DecodeOptions, Document, FieldNaming,
};
pub use error::{ArangoError, Result};
pub use protocol::{Method, Request, Response};
