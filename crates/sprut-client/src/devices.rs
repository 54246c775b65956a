//! Accessory listing and characteristic control.

use serde_json::json;
use sprut_rpc::RpcClient;
use sprut_types::{Accessory, Characteristic, ControlValue, ControllableCharacteristic, Service};

use crate::response::ApiResponse;
use crate::error::Result;

/// Expansion applied to `accessory.list` unless the caller overrides it.
pub const DEFAULT_EXPAND: &str = "services,characteristics";

/// Accessory operations. Borrow one from [`crate::Sprut::devices`].
pub struct Devices<'a> {
    pub(crate) client: &'a RpcClient,
}

impl Devices<'_> {
    /// List all paired accessories with services and characteristics.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn list(&self) -> Result<Vec<Accessory>> {
        self.list_expanded(DEFAULT_EXPAND).await
    }

    /// List accessories with an explicit `expand` selector.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn list_expanded(&self, expand: &str) -> Result<Vec<Accessory>> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"accessory": {"list": {"expand": expand}}}), None)
            .await?;
        ApiResponse::from_response(response, &["accessory", "list", "accessories"])?
            .into_data("accessories")
    }

    /// Write a value to one characteristic.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or when the hub rejects the write.
    pub async fn update_characteristic(
        &self,
        accessory_id: u64,
        service_id: u64,
        characteristic_id: u64,
        value: ControlValue,
    ) -> Result<()> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(
                json!({"characteristic": {"update": {
                    "aId": accessory_id,
                    "sId": service_id,
                    "cId": characteristic_id,
                    "control": {"value": value}
                }}}),
                None,
            )
            .await?;
        ApiResponse::<serde_json::Value>::from_response(response, &[])?.into_ack()
    }
}

/// Flatten every writable characteristic out of an accessory listing.
#[must_use]
pub fn controllable_characteristics(accessories: &[Accessory]) -> Vec<ControllableCharacteristic> {
    let mut out = Vec::new();
    for accessory in accessories {
        for service in &accessory.services {
            for characteristic in &service.characteristics {
                let Some(control) = &characteristic.control else {
                    continue;
                };
                if !control.write {
                    continue;
                }
                out.push(ControllableCharacteristic {
                    accessory_id: accessory.id,
                    accessory_name: accessory.name.clone(),
                    service_id: service.s_id,
                    service_name: service.name.clone(),
                    service_type: service.service_type.clone(),
                    characteristic_id: characteristic.c_id,
                    characteristic_name: control.name.clone(),
                    characteristic_type: control.control_type.clone(),
                    current_value: control.value.clone(),
                    writable: control.write,
                    readable: control.read,
                    has_events: control.events,
                    valid_values: control.valid_values.clone(),
                    min_value: control.min_value.clone(),
                    max_value: control.max_value.clone(),
                    min_step: control.min_step.clone(),
                });
            }
        }
    }
    out
}

/// Find one accessory by id in a listing.
#[must_use]
pub fn device_info(accessories: &[Accessory], accessory_id: u64) -> Option<&Accessory> {
    accessories.iter().find(|a| a.id == accessory_id)
}

/// Resolve one characteristic by its full (accessory, service,
/// characteristic) address.
#[must_use]
pub fn characteristic_info(
    accessories: &[Accessory],
    accessory_id: u64,
    service_id: u64,
    characteristic_id: u64,
) -> Option<(&Accessory, &Service, &Characteristic)> {
    let accessory = device_info(accessories, accessory_id)?;
    let service = accessory.services.iter().find(|s| s.s_id == service_id)?;
    let characteristic = service
        .characteristics
        .iter()
        .find(|c| c.c_id == characteristic_id)?;
    Some((accessory, service, characteristic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> Vec<Accessory> {
        serde_json::from_value(json!([
            {
                "id": 10,
                "name": "Ceiling light",
                "roomId": 1,
                "services": [{
                    "sId": 11,
                    "name": "Light",
                    "type": "Lightbulb",
                    "characteristics": [
                        {
                            "cId": 12,
                            "control": {
                                "name": "On", "type": "On",
                                "value": {"boolValue": false},
                                "read": true, "write": true, "events": true
                            }
                        },
                        {
                            "cId": 13,
                            "control": {
                                "name": "Status", "type": "StatusFault",
                                "read": true, "write": false, "events": false
                            }
                        },
                        {"cId": 14}
                    ]
                }]
            },
            {"id": 20, "name": "Sensor", "roomId": 2, "services": []}
        ]))
        .unwrap()
    }

    #[test]
    fn test_controllable_keeps_only_writable() {
        let controllable = controllable_characteristics(&listing());
        assert_eq!(controllable.len(), 1);
        let c = &controllable[0];
        assert_eq!(c.accessory_id, 10);
        assert_eq!(c.service_id, 11);
        assert_eq!(c.characteristic_id, 12);
        assert_eq!(c.characteristic_name.as_deref(), Some("On"));
        assert!(c.writable);
    }

    #[test]
    fn test_device_info_lookup() {
        let accessories = listing();
        assert_eq!(
            device_info(&accessories, 20).and_then(|a| a.name.as_deref()),
            Some("Sensor")
        );
        assert!(device_info(&accessories, 99).is_none());
    }

    #[test]
    fn test_characteristic_info_full_address() {
        let accessories = listing();
        let (accessory, service, characteristic) =
            characteristic_info(&accessories, 10, 11, 12).unwrap();
        assert_eq!(accessory.id, 10);
        assert_eq!(service.s_id, 11);
        assert_eq!(characteristic.c_id, 12);

        assert!(characteristic_info(&accessories, 10, 11, 99).is_none());
        assert!(characteristic_info(&accessories, 10, 99, 12).is_none());
    }
}
