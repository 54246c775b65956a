//! Scenario CRUD.
//!
//! Scenario bodies travel as JSON encoded in a string field; the response
//! unwrapper decodes them back into structured JSON before typing.

use serde::Serialize;
use serde_json::json;
use sprut_rpc::RpcClient;
use sprut_types::Scenario;

use crate::error::Result;
use crate::response::ApiResponse;

/// Scenario operations. Borrow one from [`crate::Sprut::scenarios`].
pub struct Scenarios<'a> {
    pub(crate) client: &'a RpcClient,
}

/// Parameters for creating a scenario. `Default` gives an empty active
/// block-type scenario that runs on hub start.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScenario {
    #[serde(rename = "type")]
    pub scenario_type: String,
    pub name: String,
    pub desc: String,
    pub on_start: bool,
    pub active: bool,
    pub sync: bool,
    pub data: String,
}

impl Default for NewScenario {
    fn default() -> Self {
        Self {
            scenario_type: "BLOCK".to_string(),
            name: String::new(),
            desc: String::new(),
            on_start: true,
            active: true,
            sync: false,
            data: String::new(),
        }
    }
}

impl Scenarios<'_> {
    /// List all scenarios stored on the hub.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn list(&self) -> Result<Vec<Scenario>> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"scenario": {"list": {}}}), None)
            .await?;
        ApiResponse::from_response(response, &["scenario", "list", "scenarios"])?
            .into_data("scenarios")
    }

    /// Fetch one scenario by index, including its body.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn get(&self, index: &str) -> Result<Scenario> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(
                json!({"scenario": {"get": {"index": index, "expand": "data"}}}),
                None,
            )
            .await?;
        ApiResponse::from_response(response, &["scenario", "get"])?.into_data("scenario")
    }

    /// Create a scenario and return the hub's record of it.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn create(&self, scenario: NewScenario) -> Result<Scenario> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"scenario": {"create": scenario}}), None)
            .await?;
        ApiResponse::from_response(response, &["scenario", "create"])?.into_data("scenario")
    }

    /// Replace the body of an existing scenario.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn update(&self, index: &str, data: &str) -> Result<Scenario> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(
                json!({"scenario": {"update": {"index": index, "data": data}}}),
                None,
            )
            .await?;
        ApiResponse::from_response(response, &["scenario", "update"])?.into_data("scenario")
    }

    /// Delete a scenario by index.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn delete(&self, index: &str) -> Result<()> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self
            .client
            .call(json!({"scenario": {"delete": {"index": index}}}), None)
            .await?;
        ApiResponse::<serde_json::Value>::from_response(response, &[])?.into_ack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scenario_defaults_and_wire_names() {
        let scenario = NewScenario::default();
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["type"], "BLOCK");
        assert_eq!(json["onStart"], true);
        assert_eq!(json["active"], true);
        assert_eq!(json["sync"], false);
        assert_eq!(json["name"], "");
    }

    #[test]
    fn test_new_scenario_custom() {
        let scenario = NewScenario {
            name: "Night".to_string(),
            active: false,
            ..NewScenario::default()
        };
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["name"], "Night");
        assert_eq!(json["active"], false);
        assert_eq!(json["type"], "BLOCK");
    }
}
