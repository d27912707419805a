//! Measurement history — time-series samples recorded per accessory.

use serde::{Deserialize, Serialize};

use crate::id::AccessoryId;
use crate::time::Timestamp;

/// One measurement sample of an accessory. Quantities the appliance does
/// not measure are left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub accessory_id: AccessoryId,
    pub recorded_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flowrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl HistoryEntry {
    /// Create a builder for a sample of `accessory_id` taken at `recorded_at`.
    #[must_use]
    pub fn builder(accessory_id: AccessoryId, recorded_at: Timestamp) -> HistoryEntryBuilder {
        HistoryEntryBuilder {
            entry: Self {
                accessory_id,
                recorded_at,
                temperature: None,
                humidity: None,
                flowrate: None,
                pressure: None,
            },
        }
    }

    /// Whether the sample carries no value at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.flowrate.is_none()
            && self.pressure.is_none()
    }
}

/// Step-by-step builder for [`HistoryEntry`].
#[derive(Debug)]
pub struct HistoryEntryBuilder {
    entry: HistoryEntry,
}

impl HistoryEntryBuilder {
    #[must_use]
    pub fn temperature(mut self, value: Option<f64>) -> Self {
        self.entry.temperature = value;
        self
    }

    #[must_use]
    pub fn humidity(mut self, value: Option<f64>) -> Self {
        self.entry.humidity = value;
        self
    }

    #[must_use]
    pub fn flowrate(mut self, value: Option<f64>) -> Self {
        self.entry.flowrate = value;
        self
    }

    #[must_use]
    pub fn pressure(mut self, value: Option<f64>) -> Self {
        self.entry.pressure = value;
        self
    }

    #[must_use]
    pub fn build(self) -> HistoryEntry {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    #[test]
    fn should_build_sample_with_measured_values() {
        let id = AccessoryId::from_unique_id("sense-1");
        let at = now();

        let entry = HistoryEntry::builder(id, at)
            .temperature(Some(21.5))
            .humidity(Some(48.0))
            .build();

        assert_eq!(entry.accessory_id, id);
        assert_eq!(entry.recorded_at, at);
        assert_eq!(entry.temperature, Some(21.5));
        assert_eq!(entry.humidity, Some(48.0));
        assert!(entry.flowrate.is_none());
        assert!(!entry.is_empty());
    }

    #[test]
    fn should_report_empty_sample() {
        let entry = HistoryEntry::builder(AccessoryId::new(), now()).build();
        assert!(entry.is_empty());
    }

    #[test]
    fn should_omit_unmeasured_quantities_when_serialized() {
        let entry = HistoryEntry::builder(AccessoryId::new(), now())
            .flowrate(Some(3.2))
            .pressure(Some(4.1))
            .build();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["flowrate"], 3.2);
        assert!(json.get("temperature").is_none());
        assert!(json.get("humidity").is_none());

        let parsed: HistoryEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }
}
