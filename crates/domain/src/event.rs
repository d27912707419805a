//! Event — an immutable record of something that happened.
//!
//! Events are produced when accessories are registered, when a
//! characteristic value changes, and when the vendor cloud reports a
//! notification for an appliance.

use serde::{Deserialize, Serialize};

use crate::id::{AccessoryId, EventId};
use crate::time::{Timestamp, now};

/// What kind of thing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AccessoryRegistered,
    CharacteristicChanged,
    NotificationReceived,
}

/// A single event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub accessory_id: Option<AccessoryId>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(
        event_type: EventType,
        accessory_id: Option<AccessoryId>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            accessory_id,
            data,
            timestamp: now(),
        }
    }
}
