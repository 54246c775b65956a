//! Unwrapping of the hub's nested response shape.
//!
//! Every domain call is answered with the request's params shape mirrored
//! back under `result`, e.g. `result.room.list.rooms`. [`ApiResponse`]
//! burrows into that nesting, maps JSON-RPC error payloads into a uniform
//! code/message pair, and decodes the payload into a typed value.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use sprut_rpc::Response;

use crate::error::{Error, Result};

/// A hub response reduced to outcome + typed payload.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Unwrap a raw response, extracting the payload at `path` inside
    /// `result`. An empty path takes the whole `result` object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] when the payload exists but does not decode
    /// as `T`; hub-level error payloads become an unsuccessful response,
    /// not an `Err`.
    pub fn from_response(response: Response, path: &[&str]) -> Result<Self> {
        if let Some(error) = response.error {
            return Ok(Self {
                success: false,
                code: error.code,
                message: error.message,
                data: None,
            });
        }

        let Some(result) = response.result else {
            return Ok(Self {
                success: false,
                code: -1,
                message: "unexpected response format".to_string(),
                data: None,
            });
        };

        let payload = if path.is_empty() {
            Some(&result)
        } else {
            path.iter().try_fold(&result, |acc, key| acc.get(key))
        };

        let data = match payload {
            Some(value) => Some(serde_json::from_value(normalize(value.clone()))?),
            None => None,
        };

        Ok(Self {
            success: true,
            code: 0,
            message: "Success".to_string(),
            data,
        })
    }

    /// The payload of a successful response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hub`] when the hub answered with an error payload
    /// and [`Error::MissingData`] when a successful response had nothing at
    /// the expected path.
    pub fn into_data(self, what: &'static str) -> Result<T> {
        if !self.success {
            return Err(Error::Hub {
                code: self.code,
                message: self.message,
            });
        }
        self.data.ok_or(Error::MissingData(what))
    }

    /// Like [`ApiResponse::into_data`] but for acknowledgement-only calls
    /// where the payload is irrelevant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hub`] when the hub answered with an error payload.
    pub fn into_ack(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(Error::Hub {
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// Some payloads carry a `data` field holding JSON encoded as a string
/// (scenario bodies). Decode it in place so typed deserialization sees the
/// real structure; leave it alone when it is not valid JSON.
fn normalize(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut()
        && let Some(Value::String(raw)) = obj.get("data")
    {
        match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => {
                obj.insert("data".to_string(), parsed);
            }
            Err(_) => warn!("payload data field is a string but not JSON"),
        }
    }
    value
}
