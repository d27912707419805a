//! Wire types of the Ondus REST API.

use serde::{Deserialize, Serialize};

/// Vendor type code of a Sense Guard, also used in valve commands.
pub const SENSE_GUARD_TYPE: i64 = 103;

/// Response of the token endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Body of `POST /oidc/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Appliance description as returned by the room and appliance endpoints.
///
/// Unknown fields are kept in `extra` so the full record can be stored as
/// accessory context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplianceInfo {
    pub appliance_id: String,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub version: String,
    /// Timestamp of the last data the appliance pushed to the cloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tdt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ApplianceConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplianceConfig {
    #[serde(default)]
    pub thresholds: Vec<ThresholdEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One configured min/max limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub quantity: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub enabled: bool,
}

/// An unread appliance notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub category: i64,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementResponse {
    #[serde(default)]
    pub data: Option<MeasurementData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementData {
    #[serde(default)]
    pub measurement: Vec<Measurement>,
}

/// A data point. Sense appliances report `timestamp`, `temperature` and
/// `humidity`; the Sense Guard reports `date`, `flowrate`, `pressure` and
/// `temperature_guard`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Measurement {
    pub timestamp: Option<String>,
    pub date: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub flowrate: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature_guard: Option<f64>,
}

impl MeasurementResponse {
    /// Consume the response, returning its data points.
    #[must_use]
    pub fn into_measurements(self) -> Vec<Measurement> {
        self.data.map(|d| d.measurement).unwrap_or_default()
    }
}

/// One entry of `GET …/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: f64,
}

/// Response of `GET`/`POST …/command`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    pub command: CommandState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandState {
    #[serde(default)]
    pub valve_open: bool,
}

/// Body of `POST …/command` for a Sense Guard.
#[derive(Debug, Clone, Serialize)]
pub struct ValveCommand {
    #[serde(rename = "type")]
    pub kind: i64,
    pub command: ValveCommandBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValveCommandBody {
    pub valve_open: bool,
}

impl ValveCommand {
    #[must_use]
    pub fn new(valve_open: bool) -> Self {
        Self {
            kind: SENSE_GUARD_TYPE,
            command: ValveCommandBody { valve_open },
        }
    }
}
