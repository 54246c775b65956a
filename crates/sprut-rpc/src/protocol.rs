//! Wire message types for the hub's JSON-RPC dialect.
//!
//! The hub speaks a JSON-RPC 2.0 variant where every request carries the
//! session token and the target hub's serial next to the standard fields,
//! and `params` is a nested object keyed by domain and action (for example
//! `{"accessory": {"list": {...}}}`). Responses echo the request id;
//! unsolicited frames carry an `event` object instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Hub error code meaning the session token is invalid or expired.
/// The only code the session engine inspects; all others pass through.
pub const STALE_TOKEN: i32 = -666_003;

pub const ACCOUNT_RESPONSE_SUCCESS: &str = "ACCOUNT_RESPONSE_SUCCESS";
pub const QUESTION_TYPE_EMAIL: &str = "QUESTION_TYPE_EMAIL";
pub const QUESTION_TYPE_PASSWORD: &str = "QUESTION_TYPE_PASSWORD";

/// One outgoing request frame.
///
/// `token` is serialized as `null` until the session has authenticated;
/// the hub expects the field to be present either way.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub token: Option<String>,
    pub serial: String,
    pub params: Value,
}

impl Envelope {
    #[must_use]
    pub fn new(id: u64, token: Option<String>, serial: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            token,
            serial: serial.into(),
            params,
        }
    }
}

/// JSON-RPC error object carried in a response frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// One response frame, matched to its request by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    #[must_use]
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn error(id: u64, error: RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the hub rejected this request's token as invalid/expired.
    #[must_use]
    pub fn is_stale_token(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.code == STALE_TOKEN)
    }

    /// Walk a nested path inside `result`, e.g. `["account", "auth", "status"]`.
    #[must_use]
    pub fn result_at(&self, path: &[&str]) -> Option<&Value> {
        let mut current = self.result.as_ref()?;
        for key in path {
            current = current.get(key)?;
        }
        Some(current)
    }
}

/// An unsolicited frame pushed by the hub (log stream, state changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: Value,
}

/// Any inbound frame: a correlated response or an unsolicited event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Response(Response),
    Event(EventFrame),
}

impl Frame {
    /// Parse a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or matches neither shape.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serialization() {
        let envelope = Envelope::new(
            3,
            Some("T".to_string()),
            "AB123",
            json!({"room": {"list": {}}}),
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 3);
        assert_eq!(json["token"], "T");
        assert_eq!(json["serial"], "AB123");
        assert_eq!(json["params"]["room"]["list"], json!({}));
    }

    #[test]
    fn test_envelope_null_token() {
        let envelope = Envelope::new(1, None, "AB123", json!({}));
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json["token"].is_null());
        assert!(
            serde_json::to_string(&envelope).unwrap().contains("\"token\":null"),
            "token must be present on the wire even when absent"
        );
    }

    #[test]
    fn test_response_parse_success() {
        let frame = Frame::parse(r#"{"id": 5, "result": {"room": {"list": {"rooms": []}}}}"#)
            .unwrap();
        let Frame::Response(response) = frame else {
            panic!("expected response frame");
        };
        assert_eq!(response.id, 5);
        assert!(response.result.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_response_parse_error() {
        let frame =
            Frame::parse(r#"{"id": 5, "error": {"code": -666003, "message": "Banned"}}"#).unwrap();
        let Frame::Response(response) = frame else {
            panic!("expected response frame");
        };
        assert!(response.is_stale_token());
    }

    #[test]
    fn test_stale_token_only_for_distinguished_code() {
        let response = Response::error(1, RpcError::new(-32603, "Internal error"));
        assert!(!response.is_stale_token());

        let response = Response::success(1, json!({}));
        assert!(!response.is_stale_token());
    }

    #[test]
    fn test_event_frame_parse() {
        let frame = Frame::parse(r#"{"event": {"log": {"log": []}}}"#).unwrap();
        assert!(matches!(frame, Frame::Event(_)));
    }

    #[test]
    fn test_malformed_frame() {
        assert!(Frame::parse("not json").is_err());
        assert!(Frame::parse(r#"{"neither": true}"#).is_err());
    }

    #[test]
    fn test_result_at() {
        let response = Response::success(
            1,
            json!({"account": {"auth": {"status": "ACCOUNT_RESPONSE_SUCCESS"}}}),
        );
        assert_eq!(
            response
                .result_at(&["account", "auth", "status"])
                .and_then(serde_json::Value::as_str),
            Some(ACCOUNT_RESPONSE_SUCCESS)
        );
        assert!(response.result_at(&["account", "answer"]).is_none());
    }
}
