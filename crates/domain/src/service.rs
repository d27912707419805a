//! Service — a group of characteristics describing one function of an accessory
//! (temperature sensor, leak sensor, valve, …).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::characteristic::{Characteristic, CharacteristicValue};
use crate::error::ValidationError;

/// Kind of service an accessory exposes. An accessory carries at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    AccessoryInformation,
    TemperatureSensor,
    HumiditySensor,
    LeakSensor,
    Valve,
    Battery,
    Switch,
}

impl ServiceKind {
    const ALL: [Self; 7] = [
        Self::AccessoryInformation,
        Self::TemperatureSensor,
        Self::HumiditySensor,
        Self::LeakSensor,
        Self::Valve,
        Self::Battery,
        Self::Switch,
    ];

    /// The `snake_case` name used on the wire and in URLs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessoryInformation => "accessory_information",
            Self::TemperatureSensor => "temperature_sensor",
            Self::HumiditySensor => "humidity_sensor",
            Self::LeakSensor => "leak_sensor",
            Self::Valve => "valve",
            Self::Battery => "battery",
            Self::Switch => "switch",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::MalformedId(s.to_string()))
    }
}

/// A service instance with its current characteristic values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub kind: ServiceKind,
    pub characteristics: BTreeMap<Characteristic, CharacteristicValue>,
}

impl Service {
    /// Create an empty service of the given kind.
    #[must_use]
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            characteristics: BTreeMap::new(),
        }
    }

    /// Builder-style helper to seed a characteristic value.
    #[must_use]
    pub fn with(
        mut self,
        characteristic: Characteristic,
        value: impl Into<CharacteristicValue>,
    ) -> Self {
        self.characteristics.insert(characteristic, value.into());
        self
    }

    /// Current value of a characteristic, if set.
    #[must_use]
    pub fn get(&self, characteristic: Characteristic) -> Option<&CharacteristicValue> {
        self.characteristics.get(&characteristic)
    }

    /// Set a characteristic value, returning the previous one.
    pub fn set(
        &mut self,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Option<CharacteristicValue> {
        self.characteristics.insert(characteristic, value)
    }
}
