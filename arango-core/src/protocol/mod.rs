//! Chunked request/response protocol.
//!
//! Messages travel as one or more chunks; each message payload is a packed
//! envelope header followed by an optional packed body.

mod chunk;
mod codec;
pub mod constants;
mod message;

pub use chunk::Chunk;
pub use codec::{Message, VstCodec};
pub use constants::*;
pub use message::{
    decode_incoming, decode_response, encode_authentication, encode_request, encode_response,
    Authentication, Body, Incoming, Method, Request, Response,
};
