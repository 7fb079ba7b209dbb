//! Protocol constants for the chunked request/response protocol.

/// Bytes written once by the client right after the transport connects.
pub const PREAMBLE: &[u8] = b"VST/1.1\r\n\r\n";

/// Size of the chunk length field in bytes.
pub const SIZE_OF_CHUNK_LENGTH_FIELD: usize = 4;

/// Size of the chunk descriptor (`chunk_x`) field in bytes.
pub const SIZE_OF_CHUNK_X_FIELD: usize = 4;

/// Size of the message id field in bytes.
pub const SIZE_OF_MESSAGE_ID_FIELD: usize = 8;

/// Size of the total message length field in bytes.
pub const SIZE_OF_MESSAGE_LENGTH_FIELD: usize = 8;

/// Total chunk header size.
pub const CHUNK_HEADER_SIZE: usize = SIZE_OF_CHUNK_LENGTH_FIELD
    + SIZE_OF_CHUNK_X_FIELD
    + SIZE_OF_MESSAGE_ID_FIELD
    + SIZE_OF_MESSAGE_LENGTH_FIELD;

/// Default maximum chunk size, header included.
pub const DEFAULT_CHUNK_SIZE: usize = 30_000;

/// Smallest chunk size accepted by the codec.
pub const MIN_CHUNK_SIZE: usize = 64;

/// Upper bound for a reassembled message. Larger announcements are a protocol error.
pub const MAX_MESSAGE_SIZE: u64 = 256 * 1024 * 1024;

/// Envelope version spoken by this driver.
pub const PROTOCOL_VERSION: i64 = 1;

/// Envelope kind of a request.
pub const KIND_REQUEST: i64 = 1;

/// Envelope kind of a response.
pub const KIND_RESPONSE: i64 = 2;

/// Envelope kind of an authentication message.
pub const KIND_AUTHENTICATION: i64 = 1000;

/// Authentication method name for user/password credentials.
pub const AUTH_PLAIN: &str = "plain";

/// Number of positional fields in a request header.
pub const REQUEST_HEADER_FIELDS: usize = 7;

/// Number of positional fields in a response header.
pub const RESPONSE_HEADER_FIELDS: usize = 4;

/// Prefix for header map keys that carry positional fields this driver does not know.
pub const EXTRA_FIELD_PREFIX: &str = "x-vst-field-";

// Header names.

/// Per-request credentials.
pub const HEADER_AUTHORIZATION: &str = "authorization";

/// Marks a read as allowed to target a follower.
pub const HEADER_ALLOW_DIRTY_READ: &str = "x-arango-allow-dirty-read";

/// Names the current leader on a 503 from a follower.
pub const HEADER_ENDPOINT: &str = "x-arango-endpoint";

// Response codes and server error numbers with driver-level meaning.

/// Service unavailable.
pub const RESPONSE_SERVICE_UNAVAILABLE: i32 = 503;

/// Not found.
pub const RESPONSE_NOT_FOUND: i32 = 404;

/// Cluster has no leader for the shard.
pub const ERROR_CLUSTER_NO_LEADER: i64 = 1496;

/// Cursor id not known to the server.
pub const ERROR_CURSOR_NOT_FOUND: i64 = 1600;
