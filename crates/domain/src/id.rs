//! Typed identifier newtypes backed by UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an [`Accessory`](crate::accessory::Accessory).
    AccessoryId
);

define_id!(
    /// Unique identifier for an [`Event`](crate::event::Event).
    EventId
);

impl AccessoryId {
    /// Derive a stable identifier from a vendor-side unique id.
    ///
    /// The same input always yields the same id, so accessories keep their
    /// identity across restarts.
    #[must_use]
    pub fn from_unique_id(unique_id: &str) -> Self {
        Self(uuid::Uuid::new_v5(
            &uuid::Uuid::NAMESPACE_OID,
            unique_id.as_bytes(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_ids_when_called_twice() {
        let a = AccessoryId::new();
        let b = AccessoryId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn should_roundtrip_through_display_and_from_str() {
        let id = AccessoryId::new();
        let text = id.to_string();
        let parsed: AccessoryId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_return_error_when_parsing_invalid_uuid() {
        let result = EventId::from_str("not-a-uuid");
        assert!(result.is_err());
    }

    #[test]
    fn should_derive_same_id_from_same_unique_id() {
        let a = AccessoryId::from_unique_id("c3c3a5a1-0b2a-4f4c-9c3b-1e7f2d4b5a6c");
        let b = AccessoryId::from_unique_id("c3c3a5a1-0b2a-4f4c-9c3b-1e7f2d4b5a6c");
        assert_eq!(a, b);
    }

    #[test]
    fn should_derive_different_ids_from_different_unique_ids() {
        let a = AccessoryId::from_unique_id("appliance-1");
        let b = AccessoryId::from_unique_id("appliance-2");
        assert_ne!(a, b);
    }
}
