use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorObject;
use crate::types::{ProtocolVersion, RequestId};

/// A JSON-RPC response frame, success or error.
///
/// This engine populates exactly one of `result`/`error`. Inbound frames
/// with both members are treated as errors (the `error` member wins); frames
/// with neither are treated as a `null` success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(
        rename = "jsonrpc",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<ProtocolVersion>,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: impl Into<RequestId>, result: Value) -> Self {
        Self {
            version: Some(ProtocolVersion::V2_0),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: impl Into<RequestId>, error: ErrorObject) -> Self {
        Self {
            version: Some(ProtocolVersion::V2_0),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Collapse into the completion value for the matching pending request.
    pub fn into_result(self) -> Result<Value, ErrorObject> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
