use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorObject;
use crate::types::{ProtocolVersion, RequestId};

/// A JSON-RPC request frame.
///
/// Outgoing requests always carry the version tag and an array `params`;
/// incoming requests are accepted without either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(
        rename = "jsonrpc",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<ProtocolVersion>,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            version: Some(ProtocolVersion::V2_0),
            id: id.into(),
            method: method.into(),
            params: Some(Value::Array(params)),
        }
    }

    /// The positional parameter list.
    ///
    /// Absent `params` is an empty sequence; anything other than an array is
    /// an invalid-params error.
    pub fn params_list(&self) -> Result<Vec<Value>, ErrorObject> {
        match &self.params {
            None => Ok(Vec::new()),
            Some(Value::Array(values)) => Ok(values.clone()),
            Some(_) => Err(ErrorObject::invalid_params()),
        }
    }
}
