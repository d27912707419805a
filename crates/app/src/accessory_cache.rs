//! In-memory accessory cache.
//!
//! Stands in for the host's persistent accessory cache: accessories survive
//! for the lifetime of the process and are replaced by unique id when a
//! platform re-registers them.

use std::collections::HashMap;

use tokio::sync::RwLock;

use ondushub_domain::accessory::Accessory;
use ondushub_domain::error::{NotFoundError, OndusHubError};
use ondushub_domain::id::AccessoryId;

use crate::ports::AccessoryRepository;

/// [`AccessoryRepository`] backed by a `HashMap` behind an async lock.
#[derive(Default)]
pub struct InMemoryAccessoryCache {
    accessories: RwLock<HashMap<AccessoryId, Accessory>>,
}

impl InMemoryAccessoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccessoryRepository for InMemoryAccessoryCache {
    async fn create(&self, accessory: Accessory) -> Result<Accessory, OndusHubError> {
        self.accessories
            .write()
            .await
            .insert(accessory.id, accessory.clone());
        Ok(accessory)
    }

    async fn get_by_id(&self, id: AccessoryId) -> Result<Option<Accessory>, OndusHubError> {
        Ok(self.accessories.read().await.get(&id).cloned())
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<Accessory>, OndusHubError> {
        Ok(self
            .accessories
            .read()
            .await
            .values()
            .find(|a| a.unique_id == unique_id)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Accessory>, OndusHubError> {
        let mut all: Vec<Accessory> = self.accessories.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(all)
    }

    async fn update(&self, accessory: Accessory) -> Result<Accessory, OndusHubError> {
        let mut guard = self.accessories.write().await;
        let Some(slot) = guard.get_mut(&accessory.id) else {
            return Err(NotFoundError {
                entity: "Accessory",
                id: accessory.id.to_string(),
            }
            .into());
        };
        *slot = accessory.clone();
        Ok(accessory)
    }
}
