//! Session engine for the Sprut.hub JSON-RPC-over-WebSocket API.
//!
//! This crate owns the connection and request lifecycle: the persistent
//! WebSocket session, the 3-step challenge/response login, the
//! correlation-id queue with per-request timeouts, and the
//! stale-token-refresh-and-retry protocol that ties them together.
//!
//! # Architecture
//!
//! - [`protocol`]: wire envelope, response and event frame types
//! - [`connection`]: WebSocket lifecycle with reconnect-after-loss
//! - [`queue`]: pending-request table with timeouts
//! - [`auth`]: login state machine and token state
//! - [`client`]: the [`RpcClient`] facade everything else talks through
//! - [`error`]: error taxonomy and `Result` alias
//!
//! # Example
//!
//! ```no_run
//! use sprut_rpc::{ClientConfig, RpcClient};
//!
//! # async fn example() -> sprut_rpc::Result<()> {
//! let client = RpcClient::new(ClientConfig::new(
//!     "ws://spruthub.local:55080/spruthub",
//!     "user@example.com",
//!     "secret",
//!     "AB1234567890",
//! ))?;
//!
//! client.connected().await;
//! client.ensure_connection_and_authentication().await?;
//!
//! let rooms = client
//!     .call(serde_json::json!({"room": {"list": {}}}), None)
//!     .await?;
//! println!("{rooms:?}");
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod queue;

// Re-export the facade types
pub use client::{ClientConfig, DEFAULT_REQUEST_TIMEOUT, RpcClient};

// Re-export error types
pub use error::{Error, Result};

// Re-export protocol types
pub use protocol::{
    ACCOUNT_RESPONSE_SUCCESS, Envelope, EventFrame, Frame, JSONRPC_VERSION, QUESTION_TYPE_EMAIL,
    QUESTION_TYPE_PASSWORD, Response, RpcError, STALE_TOKEN,
};

// Re-export the pieces needed to drive or test the components directly
pub use auth::{AuthFlow, AuthSession, Challenge, Credentials};
pub use connection::{ConnectionHandlers, ConnectionManager, ConnectionOptions};
pub use queue::ResponseQueue;
