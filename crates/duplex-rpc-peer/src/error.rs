//! The error carrier surfaced to local callers.

use serde_json::Value;
use thiserror::Error;

use duplex_rpc_wire::{codes, ErrorKind, ErrorObject};

/// Result type for engine and handler operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Message of the chain middleware contract violation.
pub(crate) const CHAIN_RETURN_RULE: &str =
    "Only the last handler in the chain can return a value";

/// An RPC failure: the numeric code, its message, opaque `data`, and a broad
/// kind tag.
///
/// The kind is derived from the code for catalogue codes; handlers raising a
/// custom error can set it explicitly and it is preserved when the error is
/// presented locally on their side. Only code, message, and data cross the
/// wire.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("rpc error {code} ({kind}): {message}")]
pub struct RpcError {
    pub kind: ErrorKind,
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    /// An error with its kind derived from `code`.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::for_code(code),
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// An error with an explicit kind, kept verbatim.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn method_not_found() -> Self {
        Self::from(ErrorObject::method_not_found())
    }

    pub fn invalid_params() -> Self {
        Self::from(ErrorObject::invalid_params())
    }

    /// `-32603` with the supplied message in place of the catalogue string.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::from(ErrorObject::internal_error(Some(message.into())))
    }

    pub fn timeout() -> Self {
        Self::from(ErrorObject::request_timeout())
    }

    pub fn disconnected() -> Self {
        Self::from(ErrorObject::connection_closed())
    }

    pub(crate) fn chain_contract() -> Self {
        Self::internal(CHAIN_RETURN_RULE)
    }

    pub fn is_timeout(&self) -> bool {
        self.code == codes::REQUEST_TIMEOUT
    }

    pub fn is_disconnected(&self) -> bool {
        self.code == codes::CONNECTION_CLOSED
    }

    /// The wire form: kind does not travel.
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject::new(self.code, self.message.clone(), self.data.clone())
    }
}

impl From<ErrorObject> for RpcError {
    fn from(object: ErrorObject) -> Self {
        Self {
            kind: object.kind(),
            code: object.code,
            message: object.message,
            data: object.data,
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(codes::PARSE_ERROR, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_derivation() {
        assert_eq!(RpcError::timeout().kind, ErrorKind::Network);
        assert_eq!(RpcError::disconnected().kind, ErrorKind::Network);
        assert_eq!(RpcError::method_not_found().kind, ErrorKind::Business);
        assert_eq!(RpcError::internal("x").kind, ErrorKind::System);
        assert_eq!(RpcError::new(-32700, "bad json").kind, ErrorKind::Protocol);
    }

    #[test]
    fn test_custom_error_round_trip() {
        let err = RpcError::new(1001, "quota exceeded").with_data(json!({"limit": 10}));
        let object = err.to_error_object();
        assert_eq!(object.code, 1001);
        assert_eq!(object.message, "quota exceeded");

        let back = RpcError::from(object);
        assert_eq!(back, err);
    }

    #[test]
    fn test_explicit_kind_kept() {
        let err = RpcError::new(1001, "nope").with_kind(ErrorKind::Business);
        assert_eq!(err.kind, ErrorKind::Business);
    }

    #[test]
    fn test_chain_contract_message() {
        let err = RpcError::chain_contract();
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, CHAIN_RETURN_RULE);
    }

    #[test]
    fn test_json_error_maps_to_parse_error() {
        let json_err = serde_json::from_str::<Value>("{oops").unwrap_err();
        let err = RpcError::from(json_err);
        assert_eq!(err.code, -32700);
        assert_eq!(err.kind, ErrorKind::Protocol);
    }
}
