use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codes;

/// The numeric error-code catalogue.
///
/// The five standard JSON-RPC codes, the two connection-level codes this
/// engine assigns from the server range, and buckets for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ConnectionClosed,
    RequestTimeout,
    /// Free server range: -32099 ..= -32002.
    Server(i64),
    /// Reserved range: -32768 ..= -32100. Decoded but never produced.
    Reserved(i64),
    /// Anything outside the reserved ranges.
    Custom(i64),
}

impl ErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            codes::PARSE_ERROR => ErrorCode::ParseError,
            codes::INVALID_REQUEST => ErrorCode::InvalidRequest,
            codes::METHOD_NOT_FOUND => ErrorCode::MethodNotFound,
            codes::INVALID_PARAMS => ErrorCode::InvalidParams,
            codes::INTERNAL_ERROR => ErrorCode::InternalError,
            codes::CONNECTION_CLOSED => ErrorCode::ConnectionClosed,
            codes::REQUEST_TIMEOUT => ErrorCode::RequestTimeout,
            c if (codes::SERVER_ERROR_START..=codes::SERVER_ERROR_END).contains(&c) => {
                ErrorCode::Server(c)
            }
            c if (codes::RESERVED_START..=codes::RESERVED_END).contains(&c) => {
                ErrorCode::Reserved(c)
            }
            c => ErrorCode::Custom(c),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => codes::PARSE_ERROR,
            ErrorCode::InvalidRequest => codes::INVALID_REQUEST,
            ErrorCode::MethodNotFound => codes::METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => codes::INVALID_PARAMS,
            ErrorCode::InternalError => codes::INTERNAL_ERROR,
            ErrorCode::ConnectionClosed => codes::CONNECTION_CLOSED,
            ErrorCode::RequestTimeout => codes::REQUEST_TIMEOUT,
            ErrorCode::Server(c) | ErrorCode::Reserved(c) | ErrorCode::Custom(c) => *c,
        }
    }

    /// The catalogue message, if this code has one. Custom and server codes
    /// carry whatever message the handler supplied.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ErrorCode::ParseError => Some("Parse error."),
            ErrorCode::InvalidRequest => Some("Invalid Request."),
            ErrorCode::MethodNotFound => Some("Method not found."),
            ErrorCode::InvalidParams => Some("Invalid params."),
            ErrorCode::InternalError => Some("Internal error."),
            ErrorCode::ConnectionClosed => Some("Server disconnected."),
            ErrorCode::RequestTimeout => Some("Request timeout."),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::for_code(self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.code(), message),
            None => write!(f, "{}", self.code()),
        }
    }
}

/// Broad classification of an error, derived from its code for catalogue
/// codes and preserved verbatim when a handler supplies one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorKind {
    Network,
    Protocol,
    Business,
    System,
}

impl ErrorKind {
    pub fn for_code(code: i64) -> Self {
        match code {
            codes::PARSE_ERROR | codes::INVALID_REQUEST => ErrorKind::Protocol,
            codes::METHOD_NOT_FOUND | codes::INVALID_PARAMS => ErrorKind::Business,
            codes::CONNECTION_CLOSED | codes::REQUEST_TIMEOUT => ErrorKind::Network,
            _ => ErrorKind::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Protocol => "PROTOCOL",
            ErrorKind::Business => "BUSINESS",
            ErrorKind::System => "SYSTEM",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `error` member of an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// An error carrying exactly the supplied code, message, and data;
    /// handler-raised errors cross the wire through this untouched.
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    fn catalogue(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            // All catalogue constructors below pass codes that carry a message.
            message: code.message().unwrap_or_default().to_string(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::catalogue(ErrorCode::ParseError)
    }

    pub fn invalid_request() -> Self {
        Self::catalogue(ErrorCode::InvalidRequest)
    }

    pub fn method_not_found() -> Self {
        Self::catalogue(ErrorCode::MethodNotFound)
    }

    pub fn invalid_params() -> Self {
        Self::catalogue(ErrorCode::InvalidParams)
    }

    /// Internal error, optionally with the failing handler's message in
    /// place of the catalogue string.
    pub fn internal_error(message: Option<String>) -> Self {
        let mut object = Self::catalogue(ErrorCode::InternalError);
        if let Some(message) = message {
            object.message = message;
        }
        object
    }

    pub fn connection_closed() -> Self {
        Self::catalogue(ErrorCode::ConnectionClosed)
    }

    pub fn request_timeout() -> Self {
        Self::catalogue(ErrorCode::RequestTimeout)
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::for_code(self.code)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorObject {}
