//! Accessory service — use-cases for registering accessories and tracking
//! their characteristic values.

use ondushub_domain::accessory::Accessory;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::{NotFoundError, OndusHubError};
use ondushub_domain::event::{Event, EventType};
use ondushub_domain::id::AccessoryId;
use ondushub_domain::service::ServiceKind;
use ondushub_domain::time::now;
use tokio::sync::Mutex;

use crate::ports::{AccessoryRepository, EventPublisher};

/// Application service for the accessory cache.
///
/// Writes go through a read-modify-write on the repository, so they are
/// serialized by `write_lock`; reads are not.
pub struct AccessoryService<R, EP> {
    repo: R,
    event_publisher: EP,
    write_lock: Mutex<()>,
}

impl<R, EP> AccessoryService<R, EP>
where
    R: AccessoryRepository + Send + Sync,
    EP: EventPublisher + Send + Sync,
{
    /// Create a new service backed by the given repository and event publisher.
    pub fn new(repo: R, event_publisher: EP) -> Self {
        Self {
            repo,
            event_publisher,
            write_lock: Mutex::new(()),
        }
    }

    /// Register an accessory, replacing it when its unique id is already cached.
    ///
    /// A replaced accessory keeps its id; its services and values are the ones
    /// of the new registration, which the platform fills from a fresh cloud
    /// read. `AccessoryRegistered` is only published the first time a unique
    /// id is seen.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::Validation`] if invariants fail, or an error
    /// propagated from the repository.
    #[tracing::instrument(skip_all, fields(unique_id = %accessory.unique_id))]
    pub async fn register_accessory(
        &self,
        mut accessory: Accessory,
    ) -> Result<Accessory, OndusHubError> {
        accessory.validate()?;
        accessory.last_updated = now();

        let guard = self.write_lock.lock().await;
        if let Some(existing) = self.repo.find_by_unique_id(&accessory.unique_id).await? {
            accessory.id = existing.id;
            tracing::debug!(id = %accessory.id, "replaced cached accessory");
            return self.repo.update(accessory).await;
        }

        let created = self.repo.create(accessory).await?;
        drop(guard);
        tracing::info!(id = %created.id, name = %created.display_name, "registered accessory");
        let event = Event::new(
            EventType::AccessoryRegistered,
            Some(created.id),
            serde_json::json!({
                "unique_id": created.unique_id,
                "display_name": created.display_name,
                "platform": created.platform,
            }),
        );
        if let Err(err) = self.event_publisher.publish(event).await {
            tracing::warn!(%err, "failed to publish AccessoryRegistered event");
        }
        Ok(created)
    }

    /// Look up an accessory by id.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::NotFound`] when no accessory with `id` exists.
    pub async fn get_accessory(&self, id: AccessoryId) -> Result<Accessory, OndusHubError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Accessory",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all accessories.
    ///
    /// # Errors
    ///
    /// Returns an error propagated from the repository.
    pub async fn list_accessories(&self) -> Result<Vec<Accessory>, OndusHubError> {
        self.repo.get_all().await
    }

    /// Set a characteristic value, publishing `CharacteristicChanged` when it
    /// differs from the cached one.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::NotFound`] when the accessory or the service
    /// does not exist.
    #[tracing::instrument(skip(self, value))]
    pub async fn update_characteristic(
        &self,
        id: AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<Accessory, OndusHubError> {
        let guard = self.write_lock.lock().await;
        let mut accessory = self.get_accessory(id).await?;
        let previous = accessory.update_characteristic(service, characteristic, value.clone(), now())?;
        if previous.as_ref() == Some(&value) {
            return Ok(accessory);
        }

        let accessory = self.repo.update(accessory).await?;
        drop(guard);
        let event = Event::new(
            EventType::CharacteristicChanged,
            Some(id),
            serde_json::json!({
                "service": service,
                "characteristic": characteristic,
                "from": previous,
                "to": value,
            }),
        );
        if let Err(err) = self.event_publisher.publish(event).await {
            tracing::warn!(%err, "failed to publish CharacteristicChanged event");
        }
        Ok(accessory)
    }
}
