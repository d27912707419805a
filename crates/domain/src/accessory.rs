//! Accessory — the smart-home representation of one cloud appliance.

use serde::{Deserialize, Serialize};

use crate::characteristic::{Characteristic, CharacteristicValue};
use crate::error::{NotFoundError, OndusHubError, ValidationError};
use crate::id::AccessoryId;
use crate::service::{Service, ServiceKind};
use crate::time::{Timestamp, now};

/// An accessory and the services it exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accessory {
    pub id: AccessoryId,
    /// Vendor-side identifier the accessory was derived from.
    pub unique_id: String,
    pub display_name: String,
    /// Name of the platform that owns this accessory (e.g. `"ondus"`).
    pub platform: String,
    pub services: Vec<Service>,
    /// Opaque platform data kept alongside the accessory (raw appliance info).
    pub context: serde_json::Value,
    pub last_updated: Timestamp,
}

impl Accessory {
    /// Create a builder for constructing an [`Accessory`].
    #[must_use]
    pub fn builder() -> AccessoryBuilder {
        AccessoryBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::Validation`] when the name or unique id is
    /// empty, or when a service kind appears twice.
    pub fn validate(&self) -> Result<(), OndusHubError> {
        if self.display_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.unique_id.is_empty() {
            return Err(ValidationError::EmptyUniqueId.into());
        }
        for (idx, service) in self.services.iter().enumerate() {
            if self.services[..idx].iter().any(|s| s.kind == service.kind) {
                return Err(ValidationError::DuplicateService(service.kind).into());
            }
        }
        Ok(())
    }

    /// Look up a service by kind.
    #[must_use]
    pub fn service(&self, kind: ServiceKind) -> Option<&Service> {
        self.services.iter().find(|s| s.kind == kind)
    }

    /// Whether the accessory exposes a service of the given kind.
    #[must_use]
    pub fn has_service(&self, kind: ServiceKind) -> bool {
        self.service(kind).is_some()
    }

    /// Current value of a characteristic on one of the services.
    #[must_use]
    pub fn characteristic(
        &self,
        kind: ServiceKind,
        characteristic: Characteristic,
    ) -> Option<&CharacteristicValue> {
        self.service(kind).and_then(|s| s.get(characteristic))
    }

    /// Update a characteristic value, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::NotFound`] when the accessory has no service
    /// of the given kind.
    pub fn update_characteristic(
        &mut self,
        kind: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
        at: Timestamp,
    ) -> Result<Option<CharacteristicValue>, OndusHubError> {
        let id = self.id;
        let service = self
            .services
            .iter_mut()
            .find(|s| s.kind == kind)
            .ok_or_else(|| NotFoundError {
                entity: "Service",
                id: format!("{id}/{kind}"),
            })?;
        let previous = service.set(characteristic, value);
        self.last_updated = at;
        Ok(previous)
    }
}

/// Step-by-step builder for [`Accessory`].
#[derive(Debug, Default)]
pub struct AccessoryBuilder {
    id: Option<AccessoryId>,
    unique_id: Option<String>,
    display_name: Option<String>,
    platform: Option<String>,
    services: Vec<Service>,
    context: Option<serde_json::Value>,
}

impl AccessoryBuilder {
    #[must_use]
    pub fn id(mut self, id: AccessoryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the vendor unique id. Unless [`id`](Self::id) is set explicitly,
    /// the accessory id is derived from it.
    #[must_use]
    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    #[must_use]
    pub fn context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Consume the builder, validate, and return an [`Accessory`].
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::Validation`] if an invariant fails.
    pub fn build(self) -> Result<Accessory, OndusHubError> {
        let unique_id = self.unique_id.unwrap_or_default();
        let accessory = Accessory {
            id: self
                .id
                .unwrap_or_else(|| AccessoryId::from_unique_id(&unique_id)),
            unique_id,
            display_name: self.display_name.unwrap_or_default(),
            platform: self.platform.unwrap_or_default(),
            services: self.services,
            context: self.context.unwrap_or(serde_json::Value::Null),
            last_updated: now(),
        };
        accessory.validate()?;
        Ok(accessory)
    }
}
