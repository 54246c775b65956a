//! Aggregated system snapshot.

use serde::Serialize;
use sprut_rpc::RpcClient;
use sprut_types::{Accessory, ControllableCharacteristic, HubInfo, Room, Scenario};
use tracing::warn;

use crate::devices::{Devices, controllable_characteristics};
use crate::hubs::Hubs;
use crate::rooms::Rooms;
use crate::scenarios::Scenarios;

/// Everything the hub knows, fetched in one round of concurrent listings.
///
/// Sections that failed to load stay empty; the failure messages are kept
/// in `errors` so a partially reachable hub still yields a usable snapshot.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub hubs: Vec<HubInfo>,
    pub accessories: Vec<Accessory>,
    pub rooms: Vec<Room>,
    pub scenarios: Vec<Scenario>,
    pub controllable: Vec<ControllableCharacteristic>,
    pub errors: Vec<String>,
}

/// Snapshot operations. Borrow one from [`crate::Sprut::system`].
pub struct System<'a> {
    pub(crate) client: &'a RpcClient,
}

impl System<'_> {
    /// Fetch hubs, accessories, rooms, and scenarios concurrently and
    /// flatten the writable characteristics.
    pub async fn snapshot(&self) -> SystemSnapshot {
        let hubs = Hubs {
            client: self.client,
        };
        let devices = Devices {
            client: self.client,
        };
        let rooms = Rooms {
            client: self.client,
        };
        let scenarios = Scenarios {
            client: self.client,
        };

        let (hubs, accessories, rooms, scenarios) = tokio::join!(
            hubs.list(),
            devices.list(),
            rooms.list(),
            scenarios.list()
        );

        let mut snapshot = SystemSnapshot::default();
        match hubs {
            Ok(list) => snapshot.hubs = list,
            Err(e) => snapshot.errors.push(format!("hubs: {e}")),
        }
        match accessories {
            Ok(list) => snapshot.accessories = list,
            Err(e) => snapshot.errors.push(format!("accessories: {e}")),
        }
        match rooms {
            Ok(list) => snapshot.rooms = list,
            Err(e) => snapshot.errors.push(format!("rooms: {e}")),
        }
        match scenarios {
            Ok(list) => snapshot.scenarios = list,
            Err(e) => snapshot.errors.push(format!("scenarios: {e}")),
        }

        if !snapshot.errors.is_empty() {
            warn!("system snapshot is partial: {:?}", snapshot.errors);
        }

        snapshot.controllable = controllable_characteristics(&snapshot.accessories);
        snapshot
    }
}
