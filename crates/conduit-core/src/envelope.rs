//! Request and response envelopes.

use crate::failure::WireFailure;
use crate::signature::MethodSignature;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call: target signature plus its stripped arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub signature: MethodSignature,
    pub arguments: Vec<Value>,
}

impl RequestEnvelope {
    pub fn new(signature: MethodSignature, arguments: Vec<Value>) -> Self {
        Self {
            signature,
            arguments,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Outcome of one call. Exactly one of `result` and `failure` is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Stripped result; `null` for calls returning nothing.
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<WireFailure>,
}

impl ResponseEnvelope {
    pub fn success(result: Value) -> Self {
        Self {
            result,
            failure: None,
        }
    }

    pub fn failure(failure: WireFailure) -> Self {
        Self {
            result: Value::Null,
            failure: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::DeclaredType;
    use crate::ConduitError;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = RequestEnvelope::new(
            MethodSignature::new("example.Hello", "hi", vec![DeclaredType::plain("string")]),
            vec![json!("Bob")],
        );
        let json: Value = serde_json::from_slice(&request.encode().unwrap()).unwrap();
        assert_eq!(json["signature"]["owner"], "example.Hello");
        assert_eq!(json["signature"]["name"], "hi");
        assert_eq!(json["arguments"], json!(["Bob"]));
        assert_eq!(RequestEnvelope::decode(&request.encode().unwrap()).unwrap(), request);
    }

    #[test]
    fn test_success_response_omits_failure() {
        let bytes = ResponseEnvelope::success(json!("Hi, Bob")).encode().unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, json!({"result": "Hi, Bob"}));
    }

    #[test]
    fn test_failure_response() {
        let response = ResponseEnvelope::failure(WireFailure::new(
            WireFailure::PROTOCOL_ERROR,
            "no such method",
        ));
        assert!(response.is_failure());
        assert!(response.result.is_null());

        let decoded = ResponseEnvelope::decode(&response.encode().unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_garbage_is_codec_error() {
        let err = RequestEnvelope::decode(b"not json").unwrap_err();
        assert!(matches!(err, ConduitError::Codec { .. }));

        let err = RequestEnvelope::decode(br#"{"arguments": []}"#).unwrap_err();
        assert!(matches!(err, ConduitError::Codec { .. }));
    }
}
