//! Shared types for the Sprut.hub client crates.
//!
//! This crate provides the hub entity types used across sprut-rpc,
//! sprut-client, and sprut-cli. All types are serializable with the field
//! names the hub speaks on the wire (camelCase, `aId`/`sId`/`cId` ids).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Deserialize a Vec that may be null or missing (both become empty vec)
fn deserialize_null_as_empty_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// A typed characteristic control value.
///
/// The hub expects exactly one of `boolValue`, `intValue`, `floatValue`, or
/// `stringValue` in an update request, and reports values the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Bool {
        #[serde(rename = "boolValue")]
        bool_value: bool,
    },
    Int {
        #[serde(rename = "intValue")]
        int_value: i64,
    },
    Float {
        #[serde(rename = "floatValue")]
        float_value: f64,
    },
    Str {
        #[serde(rename = "stringValue")]
        string_value: String,
    },
}

impl ControlValue {
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Bool { bool_value: value }
    }

    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Int { int_value: value }
    }

    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::Float { float_value: value }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Str {
            string_value: value.into(),
        }
    }

    /// Infer a control value from a loose JSON value.
    ///
    /// Booleans map to `boolValue`, whole numbers to `intValue`, other
    /// numbers to `floatValue`, and everything else to its string form.
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::bool(*b),
            Value::Number(n) => n.as_i64().map_or_else(
                || Self::float(n.as_f64().unwrap_or(0.0)),
                Self::int,
            ),
            Value::String(s) => Self::string(s.clone()),
            other => Self::string(other.to_string()),
        }
    }

    /// Parse a control value from user input text.
    ///
    /// `true`/`false` become booleans, numeric text becomes int or float,
    /// anything else stays a string.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if let Ok(b) = text.parse::<bool>() {
            return Self::bool(b);
        }
        if let Ok(i) = text.parse::<i64>() {
            return Self::int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Self::float(f);
        }
        Self::string(text)
    }
}

/// Control metadata and current value of a characteristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub control_type: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub events: bool,
    #[serde(default)]
    pub valid_values: Option<Value>,
    #[serde(default)]
    pub min_value: Option<Value>,
    #[serde(default)]
    pub max_value: Option<Value>,
    #[serde(default)]
    pub min_step: Option<Value>,
}

/// One characteristic of a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Characteristic {
    #[serde(rename = "cId")]
    pub c_id: u64,
    #[serde(default)]
    pub control: Option<Control>,
}

/// One service of an accessory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "sId")]
    pub s_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty_vec")]
    pub characteristics: Vec<Characteristic>,
}

/// One accessory (device) paired with the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub room_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty_vec")]
    pub services: Vec<Service>,
}

/// A flattened view of one writable characteristic, for discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllableCharacteristic {
    pub accessory_id: u64,
    pub accessory_name: Option<String>,
    pub service_id: u64,
    pub service_name: Option<String>,
    pub service_type: Option<String>,
    pub characteristic_id: u64,
    pub characteristic_name: Option<String>,
    pub characteristic_type: Option<String>,
    pub current_value: Option<Value>,
    pub writable: bool,
    pub readable: bool,
    pub has_events: bool,
    pub valid_values: Option<Value>,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    pub min_step: Option<Value>,
}

/// A room configured on the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

/// Firmware version details as reported by the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDetails {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub revision: Option<i64>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub hardware: Option<String>,
}

/// Version block of a hub entry. Older firmwares put the fields at the top
/// level, newer ones nest them under `current`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubVersion {
    #[serde(default)]
    pub current: Option<VersionDetails>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub revision: Option<i64>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// One hub as reported by `hub.list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubInfo {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub discovery: Option<bool>,
    #[serde(default)]
    pub version: Option<HubVersion>,
}

impl HubInfo {
    /// The effective firmware version string, preferring the nested
    /// `current` block over the legacy top-level field.
    #[must_use]
    pub fn firmware_version(&self) -> Option<&str> {
        let version = self.version.as_ref()?;
        version
            .current
            .as_ref()
            .and_then(|c| c.version.as_deref())
            .or(version.version.as_deref())
    }
}

/// A scenario stored on the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub scenario_type: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// One entry of the hub's internal log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Identity a client reports to the hub via `server.clientInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub client_type: String,
    #[serde(default)]
    pub auth: String,
}
