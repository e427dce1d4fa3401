//! # JSON-RPC 2.0 wire layer
//!
//! Frame types, classification, and the error catalogue shared by both sides
//! of a duplex-rpc connection. This crate is pure data: no transport, no
//! dispatch, no runtime.
//!
//! A frame is one JSON-encoded object carried as one channel message. Three
//! shapes exist on the wire:
//!
//! - Request: `{ id, method, params }` — `params` is always an array.
//! - Success response: `{ id, result }`.
//! - Error response: `{ id, error: { code, message, data? } }`.
//!
//! The `jsonrpc` version tag is written on every outgoing frame but is
//! optional on input; its absence is never an error.

pub mod codec;
pub mod error;
pub mod request;
pub mod response;
pub mod types;

pub use codec::{DecodeError, Frame};
pub use error::{ErrorCode, ErrorKind, ErrorObject};
pub use request::Request;
pub use response::Response;
pub use types::{ProtocolVersion, RequestId};

/// JSON-RPC version tag written on outgoing frames.
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes plus the connection-level codes this
/// engine assigns from the implementation-defined server range.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Connection closed while the request was pending.
    pub const CONNECTION_CLOSED: i64 = -32000;
    /// Per-call deadline elapsed before a response arrived.
    pub const REQUEST_TIMEOUT: i64 = -32001;

    // Remaining server range: free for server implementations.
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32002;

    // Reserved by the JSON-RPC spec; never newly assigned here.
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32100;
}
