//! Room listing and room-based accessory grouping.

use serde_json::json;
use sprut_rpc::RpcClient;
use sprut_types::{Accessory, Room};

use crate::error::Result;
use crate::response::ApiResponse;

/// Room operations. Borrow one from [`crate::Sprut::rooms`].
pub struct Rooms<'a> {
    pub(crate) client: &'a RpcClient,
}

impl Rooms<'_> {
    /// List all rooms configured on the hub.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn list(&self) -> Result<Vec<Room>> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"room": {"list": {}}}), None)
            .await?;
        ApiResponse::from_response(response, &["room", "list", "rooms"])?.into_data("rooms")
    }
}

/// Accessories assigned to one room.
#[must_use]
pub fn devices_in_room(accessories: &[Accessory], room_id: u64) -> Vec<&Accessory> {
    accessories
        .iter()
        .filter(|a| a.room_id == Some(room_id))
        .collect()
}
