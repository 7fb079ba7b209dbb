//! Error types for driver operations.

use std::io;
use thiserror::Error;

/// The main error type for driver operations.
#[derive(Debug, Error)]
pub enum ArangoError {
    /// Invalid configuration, raised while building a client.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed or truncated frame. Fatal to the connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Malformed packed document, or a document that does not fit the requested type.
    #[error("codec error: {0}")]
    Codec(String),

    /// The server speaks a protocol version this driver does not understand.
    #[error("incompatible server: expected protocol version {expected}, got {actual}")]
    IncompatibleServer {
        /// Version the driver speaks.
        expected: i64,
        /// Version found in the response envelope.
        actual: i64,
    },

    /// The connection closed while the request was outstanding.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Every configured host is marked dead.
    #[error("no host available: {0}")]
    NoHostAvailable(String),

    /// A request, acquire or connect deadline expired.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The server answered with an error body.
    #[error("server error {error_num} (HTTP {code}): {message}")]
    Server {
        /// Server-specific error number.
        error_num: i64,
        /// HTTP-like response code.
        code: i32,
        /// Human readable message.
        message: String,
    },

    /// The cursor was closed before the operation.
    #[error("cursor closed")]
    CursorClosed,

    /// The host a cursor is pinned to became unreachable.
    #[error("cursor host lost: {0}")]
    CursorHostLost(String),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArangoError {
    /// Creates a server error from its parts.
    pub fn server(error_num: i64, code: i32, message: impl Into<String>) -> Self {
        Self::Server {
            error_num,
            code,
            message: message.into(),
        }
    }

    /// Returns true for transport-level failures the executor may retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed(_) | Self::Io(_) | Self::NoHostAvailable(_)
        )
    }

    /// Returns true for frame-level failures that poison the connection.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::Codec(_) | Self::IncompatibleServer { .. }
        )
    }

    /// Returns the server error number, if this is a server error.
    pub fn server_error_num(&self) -> Option<i64> {
        match self {
            Self::Server { error_num, .. } => Some(*error_num),
            _ => None,
        }
    }

    /// Returns the response code, if this is a server error.
    pub fn response_code(&self) -> Option<i32> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Produces an equivalent error for fanning one failure out to several waiters.
    ///
    /// `io::Error` is not `Clone`, so I/O failures are carried over as
    /// `ConnectionClosed` with the original message.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Configuration(m) => Self::Configuration(m.clone()),
            Self::Protocol(m) => Self::Protocol(m.clone()),
            Self::Codec(m) => Self::Codec(m.clone()),
            Self::IncompatibleServer { expected, actual } => Self::IncompatibleServer {
                expected: *expected,
                actual: *actual,
            },
            Self::ConnectionClosed(m) => Self::ConnectionClosed(m.clone()),
            Self::NoHostAvailable(m) => Self::NoHostAvailable(m.clone()),
            Self::Timeout(m) => Self::Timeout(m.clone()),
            Self::Cancelled => Self::Cancelled,
            Self::Server {
                error_num,
                code,
                message,
            } => Self::Server {
                error_num: *error_num,
                code: *code,
                message: message.clone(),
            },
            Self::CursorClosed => Self::CursorClosed,
            Self::CursorHostLost(m) => Self::CursorHostLost(m.clone()),
            Self::Io(e) => Self::ConnectionClosed(e.to_string()),
        }
    }
}

/// A specialized `Result` type for driver operations.
pub type Result<T> = std::result::Result<T, ArangoError>;
