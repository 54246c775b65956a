//! High-level managers over the Sprut.hub session engine.
//!
//! [`Sprut`] wraps an [`RpcClient`] and hands out thin per-domain managers
//! that build the nested request payloads, unwrap the mirrored response
//! shape, and decode hub data into the types from `sprut-types`.
//!
//! # Example
//!
//! ```no_run
//! use sprut_client::Sprut;
//! use sprut_rpc::ClientConfig;
//! use sprut_types::ControlValue;
//!
//! # async fn example() -> sprut_client::Result<()> {
//! let sprut = Sprut::new(ClientConfig::new(
//!     "ws://spruthub.local:55080/spruthub",
//!     "user@example.com",
//!     "secret",
//!     "AB1234567890",
//! ))?;
//! sprut.client().connected().await;
//!
//! for room in sprut.rooms().list().await? {
//!     println!("{:?}", room.name);
//! }
//!
//! sprut
//!     .devices()
//!     .update_characteristic(10, 11, 12, ControlValue::bool(true))
//!     .await?;
//!
//! sprut.close().await;
//! # Ok(())
//! # }
//! ```

pub mod devices;
pub mod error;
pub mod hubs;
pub mod logs;
pub mod response;
pub mod rooms;
pub mod scenarios;
pub mod system;

pub use devices::{Devices, characteristic_info, controllable_characteristics, device_info};
pub use error::{Error, Result};
pub use hubs::{Hubs, VersionSummary};
pub use logs::{Logs, decode_log_event};
pub use response::ApiResponse;
pub use rooms::{Rooms, devices_in_room};
pub use scenarios::{NewScenario, Scenarios};
pub use system::{System, SystemSnapshot};

use sprut_rpc::{ClientConfig, RpcClient};

/// Entry point bundling all entity managers around one hub session.
#[derive(Clone)]
pub struct Sprut {
    client: RpcClient,
}

impl Sprut {
    /// Create a client and start connecting in the background.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing field or non-WebSocket
    /// URL; see [`RpcClient::new`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: RpcClient::new(config)?,
        })
    }

    /// Wrap an already-built session.
    #[must_use]
    pub fn from_client(client: RpcClient) -> Self {
        Self { client }
    }

    /// The underlying session, for raw calls and event subscription.
    #[must_use]
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    #[must_use]
    pub fn devices(&self) -> Devices<'_> {
        Devices {
            client: &self.client,
        }
    }

    #[must_use]
    pub fn hubs(&self) -> Hubs<'_> {
        Hubs {
            client: &self.client,
        }
    }

    #[must_use]
    pub fn rooms(&self) -> Rooms<'_> {
        Rooms {
            client: &self.client,
        }
    }

    #[must_use]
    pub fn scenarios(&self) -> Scenarios<'_> {
        Scenarios {
            client: &self.client,
        }
    }

    #[must_use]
    pub fn logs(&self) -> Logs<'_> {
        Logs {
            client: &self.client,
        }
    }

    #[must_use]
    pub fn system(&self) -> System<'_> {
        System {
            client: &self.client,
        }
    }

    /// Graceful shutdown of the underlying session.
    pub async fn close(&self) {
        self.client.close().await;
    }
}
