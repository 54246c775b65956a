//! Hub listing, version summary, and client registration.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sprut_rpc::RpcClient;
use sprut_types::{ClientInfo, HubInfo};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::response::ApiResponse;

/// Hub operations. Borrow one from [`crate::Sprut::hubs`].
pub struct Hubs<'a> {
    pub(crate) client: &'a RpcClient,
}

/// Flattened identity and firmware info of one hub, built from the first
/// entry of `hub.list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version: Option<String>,
    pub revision: Option<i64>,
    pub template: Option<String>,
    pub hardware: Option<String>,
    pub branch: Option<String>,
    pub platform: Option<String>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub owner: Option<String>,
    pub lang: Option<String>,
    pub online: Option<bool>,
    pub last_seen: Option<i64>,
    pub discovery: Option<bool>,
}

impl VersionSummary {
    /// Newer firmwares report version fields under `version.current`;
    /// older ones at the top level of `version`. Prefer the nested block.
    #[must_use]
    pub fn from_hub(hub: &HubInfo) -> Self {
        let version = hub.version.as_ref();
        let current = version.and_then(|v| v.current.as_ref());
        Self {
            version: hub.firmware_version().map(str::to_string),
            revision: current
                .and_then(|c| c.revision)
                .or(version.and_then(|v| v.revision)),
            template: current.and_then(|c| c.template.clone()),
            hardware: current.and_then(|c| c.hardware.clone()),
            branch: version.and_then(|v| v.branch.clone()),
            platform: hub.platform.clone(),
            name: hub.name.clone(),
            manufacturer: hub.manufacturer.clone(),
            model: hub.model.clone(),
            serial: hub.serial.clone(),
            owner: hub.owner.clone(),
            lang: hub.lang.clone(),
            online: hub.online,
            last_seen: hub.last_seen,
            discovery: hub.discovery,
        }
    }
}

impl Hubs<'_> {
    /// List all hubs visible to this account.
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn list(&self) -> Result<Vec<HubInfo>> {
        self.client.ensure_connection_and_authentication().await?;
        let response = self.client.call(json!({"hub": {"list": {}}}), None).await?;
        ApiResponse::from_response(response, &["hub", "list", "hubs"])?.into_data("hubs")
    }

    /// Identity and firmware summary of the first listed hub.
    ///
    /// # Errors
    ///
    /// Fails like [`Hubs::list`], or with [`Error::MissingData`] when the
    /// account has no hubs.
    pub async fn version(&self) -> Result<VersionSummary> {
        let hubs = self.list().await?;
        let hub = hubs.first().ok_or(Error::MissingData("hubs"))?;
        Ok(VersionSummary::from_hub(hub))
    }

    /// Register this client's identity with the hub (`server.clientInfo`).
    ///
    /// # Errors
    ///
    /// Fails on connection/auth problems or a hub-level error payload.
    pub async fn set_client_info(&self, info: Option<ClientInfo>) -> Result<Value> {
        self.client.ensure_connection_and_authentication().await?;
        let info = info.unwrap_or_else(default_client_info);
        let response = self
            .client
            .call(json!({"server": {"clientInfo": info}}), None)
            .await?;
        ApiResponse::from_response(response, &[])?.into_data("clientInfo ack")
    }
}

fn default_client_info() -> ClientInfo {
    ClientInfo {
        id: Uuid::new_v4().to_string(),
        name: "Sprut Rust Client".to_string(),
        client_type: "CLIENT_DESKTOP".to_string(),
        auth: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_summary_prefers_nested_current() {
        let hub: HubInfo = serde_json::from_value(json!({
            "serial": "AB123",
            "name": "Home",
            "platform": "MDNS",
            "online": true,
            "version": {
                "branch": "release",
                "version": "1.4.2",
                "revision": 8000,
                "current": {
                    "version": "1.9.9",
                    "revision": 9100,
                    "template": "v3",
                    "hardware": "r5"
                }
            }
        }))
        .unwrap();

        let summary = VersionSummary::from_hub(&hub);
        assert_eq!(summary.version.as_deref(), Some("1.9.9"));
        assert_eq!(summary.revision, Some(9100));
        assert_eq!(summary.template.as_deref(), Some("v3"));
        assert_eq!(summary.hardware.as_deref(), Some("r5"));
        assert_eq!(summary.branch.as_deref(), Some("release"));
        assert_eq!(summary.serial.as_deref(), Some("AB123"));
    }

    #[test]
    fn test_version_summary_legacy_fields() {
        let hub: HubInfo = serde_json::from_value(json!({
            "serial": "AB123",
            "version": {"version": "1.4.2", "revision": 8000}
        }))
        .unwrap();

        let summary = VersionSummary::from_hub(&hub);
        assert_eq!(summary.version.as_deref(), Some("1.4.2"));
        assert_eq!(summary.revision, Some(8000));
        assert_eq!(summary.template, None);
    }

    #[test]
    fn test_default_client_info_shape() {
        let info = default_client_info();
        assert_eq!(info.client_type, "CLIENT_DESKTOP");
        assert!(!info.id.is_empty());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "CLIENT_DESKTOP");
    }
}
