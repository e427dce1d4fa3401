use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::ErrorObject;
use crate::request::Request;
use crate::response::Response;
use crate::types::RequestId;

/// One decoded channel message.
///
/// Classification order follows the protocol: a string `method` member makes
/// a frame a request; otherwise an `id` member makes it a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Request(Request),
    Response(Response),
}

impl Frame {
    /// Decode and classify one message.
    pub fn decode(text: &str) -> Result<Frame, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Self::classify(value)
    }

    fn classify(value: Value) -> Result<Frame, DecodeError> {
        let Value::Object(ref members) = value else {
            return Err(DecodeError::UnknownShape);
        };

        if members.get("method").is_some_and(Value::is_string) {
            let request = serde_json::from_value(value).map_err(|_| DecodeError::UnknownShape)?;
            return Ok(Frame::Request(request));
        }
        if members.contains_key("id") {
            let response = serde_json::from_value(value).map_err(|_| DecodeError::UnknownShape)?;
            return Ok(Frame::Response(response));
        }
        Err(DecodeError::UnknownShape)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn id(&self) -> &RequestId {
        match self {
            Frame::Request(request) => &request.id,
            Frame::Response(response) => &response.id,
        }
    }
}

/// Why an inbound message could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame is neither a request nor a response")]
    UnknownShape,
}

impl DecodeError {
    /// The error response owed to the peer for this undecodable message.
    ///
    /// The id is never guessed: undecodable frames answer with id `-1`.
    pub fn to_response(&self) -> Response {
        let error = match self {
            DecodeError::Malformed(_) => ErrorObject::parse_error(),
            DecodeError::UnknownShape => ErrorObject::invalid_request(),
        };
        Response::error(-1, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_classification() {
        let frame = Frame::decode(r#"{"id": 1, "method": "a.b", "params": [true]}"#).unwrap();
        match frame {
            Frame::Request(request) => {
                assert_eq!(request.method, "a.b");
                assert_eq!(request.params_list().unwrap(), vec![json!(true)]);
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_response_classification() {
        let frame = Frame::decode(r#"{"id": 1, "result": 3}"#).unwrap();
        assert!(matches!(frame, Frame::Response(_)));

        let frame = Frame::decode(
            r#"{"id": 1, "error": {"code": -32601, "message": "Method not found."}}"#,
        )
        .unwrap();
        match frame {
            Frame::Response(response) => assert!(response.is_error()),
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_method_takes_precedence_over_id() {
        // Both members present: the string method makes it a request.
        let frame = Frame::decode(r#"{"id": 1, "method": "m", "result": 3}"#).unwrap();
        assert!(matches!(frame, Frame::Request(_)));
    }

    #[test]
    fn test_non_string_method_is_not_a_request() {
        let frame = Frame::decode(r#"{"id": 1, "method": 5}"#).unwrap();
        assert!(matches!(frame, Frame::Response(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = Frame::decode("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));

        let response = err.to_response();
        assert_eq!(response.id, RequestId::Number(-1));
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[test]
    fn test_unclassifiable_shapes() {
        for text in [r#"{"jsonrpc": "2.0"}"#, "[1, 2]", "5", r#""hello""#] {
            let err = Frame::decode(text).unwrap_err();
            assert!(matches!(err, DecodeError::UnknownShape), "text: {}", text);
            assert_eq!(err.to_response().error.unwrap().code, -32600);
        }
    }

    #[test]
    fn test_round_trip() {
        let frame = Frame::Request(Request::new(7, "user.special", vec![json!({"t": 1})]));
        let encoded = frame.encode().unwrap();
        assert_eq!(Frame::decode(&encoded).unwrap(), frame);
    }
}
