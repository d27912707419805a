//! Characteristics — typed properties exposed by an accessory service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Kind of characteristic a service can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    Name,
    Manufacturer,
    Model,
    SerialNumber,
    FirmwareRevision,
    HardwareRevision,
    AppMatchingIdentifier,
    CurrentTemperature,
    CurrentRelativeHumidity,
    LeakDetected,
    StatusActive,
    StatusFault,
    Active,
    InUse,
    ValveType,
    BatteryLevel,
    StatusLowBattery,
    ChargingState,
    On,
}

impl Characteristic {
    const ALL: [Self; 19] = [
        Self::Name,
        Self::Manufacturer,
        Self::Model,
        Self::SerialNumber,
        Self::FirmwareRevision,
        Self::HardwareRevision,
        Self::AppMatchingIdentifier,
        Self::CurrentTemperature,
        Self::CurrentRelativeHumidity,
        Self::LeakDetected,
        Self::StatusActive,
        Self::StatusFault,
        Self::Active,
        Self::InUse,
        Self::ValveType,
        Self::BatteryLevel,
        Self::StatusLowBattery,
        Self::ChargingState,
        Self::On,
    ];

    /// The `snake_case` name used on the wire and in URLs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Manufacturer => "manufacturer",
            Self::Model => "model",
            Self::SerialNumber => "serial_number",
            Self::FirmwareRevision => "firmware_revision",
            Self::HardwareRevision => "hardware_revision",
            Self::AppMatchingIdentifier => "app_matching_identifier",
            Self::CurrentTemperature => "current_temperature",
            Self::CurrentRelativeHumidity => "current_relative_humidity",
            Self::LeakDetected => "leak_detected",
            Self::StatusActive => "status_active",
            Self::StatusFault => "status_fault",
            Self::Active => "active",
            Self::InUse => "in_use",
            Self::ValveType => "valve_type",
            Self::BatteryLevel => "battery_level",
            Self::StatusLowBattery => "status_low_battery",
            Self::ChargingState => "charging_state",
            Self::On => "on",
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Characteristic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::MalformedId(s.to_string()))
    }
}

/// A single typed characteristic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl CharacteristicValue {
    /// `ChargingState.NOT_CHARGEABLE`.
    pub const NOT_CHARGEABLE: Self = Self::Int(2);
    /// `ValveType.GENERIC_VALVE`.
    pub const GENERIC_VALVE: Self = Self::Int(0);

    /// `StatusFault`: `GENERAL_FAULT` (1) when `faulted`, else `NO_FAULT` (0).
    #[must_use]
    pub fn fault(faulted: bool) -> Self {
        Self::Int(i64::from(faulted))
    }

    /// `LeakDetected`: `LEAK_DETECTED` (1) or `LEAK_NOT_DETECTED` (0).
    #[must_use]
    pub fn leak(detected: bool) -> Self {
        Self::Int(i64::from(detected))
    }

    /// `Active`: `ACTIVE` (1) or `INACTIVE` (0).
    #[must_use]
    pub fn active(active: bool) -> Self {
        Self::Int(i64::from(active))
    }

    /// `InUse`: `IN_USE` (1) or `NOT_IN_USE` (0).
    #[must_use]
    pub fn in_use(in_use: bool) -> Self {
        Self::Int(i64::from(in_use))
    }

    /// `StatusLowBattery`: `BATTERY_LEVEL_LOW` (1) or `BATTERY_LEVEL_NORMAL` (0).
    #[must_use]
    pub fn low_battery(low: bool) -> Self {
        Self::Int(i64::from(low))
    }

    /// Interpret the value as a boolean flag.
    ///
    /// Integers are truthy when non-zero, which matches how enumerated
    /// characteristics such as `Active` encode their two states.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Float(_) | Self::String(_) => None,
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for CharacteristicValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for CharacteristicValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for CharacteristicValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_every_characteristic_from_its_name() {
        for c in Characteristic::ALL {
            assert_eq!(c.as_str().parse::<Characteristic>().unwrap(), c);
        }
    }

    #[test]
    fn should_reject_unknown_characteristic_name() {
        let result = "brightness".parse::<Characteristic>();
        assert_eq!(
            result,
            Err(ValidationError::MalformedId("brightness".to_string()))
        );
    }

    #[test]
    fn should_serialize_characteristic_as_snake_case() {
        let json = serde_json::to_string(&Characteristic::CurrentRelativeHumidity).unwrap();
        assert_eq!(json, "\"current_relative_humidity\"");
    }

    #[test]
    fn should_encode_fault_as_integer_flag() {
        assert_eq!(CharacteristicValue::fault(true), CharacteristicValue::Int(1));
        assert_eq!(CharacteristicValue::fault(false), CharacteristicValue::Int(0));
    }

    #[test]
    fn should_read_integer_flags_as_bool() {
        assert_eq!(CharacteristicValue::Int(1).as_bool(), Some(true));
        assert_eq!(CharacteristicValue::Int(0).as_bool(), Some(false));
        assert_eq!(CharacteristicValue::Bool(true).as_bool(), Some(true));
        assert_eq!(CharacteristicValue::Float(1.0).as_bool(), None);
    }

    #[test]
    fn should_serialize_values_untagged() {
        assert_eq!(
            serde_json::to_string(&CharacteristicValue::Float(21.5)).unwrap(),
            "21.5"
        );
        assert_eq!(
            serde_json::to_string(&CharacteristicValue::from("Grohe AG")).unwrap(),
            "\"Grohe AG\""
        );
    }

    #[test]
    fn should_deserialize_integer_json_as_int_variant() {
        let val: CharacteristicValue = serde_json::from_str("1").unwrap();
        assert_eq!(val, CharacteristicValue::Int(1));
    }
}
