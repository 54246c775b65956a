//! Error taxonomy for the entity managers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A session-layer failure: transport, timeout, or authentication.
    #[error(transparent)]
    Rpc(#[from] sprut_rpc::Error),

    /// The hub answered with a JSON-RPC error payload.
    #[error("hub error {code}: {message}")]
    Hub { code: i32, message: String },

    /// The hub answered successfully but the expected data was absent.
    #[error("hub response carried no {0}")]
    MissingData(&'static str),

    /// The hub's data did not match the expected shape.
    #[error("failed to decode hub data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
