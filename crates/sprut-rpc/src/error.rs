//! Error types for the sprut-rpc crate.

use std::time::Duration;

use crate::auth::Challenge;

/// Unified error type for hub RPC operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation attempted while the connection is not established
    #[error("Not connected")]
    NotConnected,

    /// Send attempted on a transport that is not in the open state
    #[error("WebSocket is not open")]
    NotOpen,

    /// No response arrived within the configured window
    #[error("Request {id} timed out after {timeout:?}")]
    RequestTimeout { id: u64, timeout: Duration },

    /// The hub's login flow deviated from the expected challenge sequence
    #[error("Expected {expected} challenge, got {got}")]
    UnexpectedChallengeType { expected: Challenge, got: String },

    /// The hub rejected the final authentication step
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The connection went away while a request was in flight
    #[error("Connection closed")]
    ConnectionClosed,

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport error
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
