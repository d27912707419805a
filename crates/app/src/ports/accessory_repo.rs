//! Accessory repository port — the host's accessory cache.

use std::future::Future;

use ondushub_domain::accessory::Accessory;
use ondushub_domain::error::OndusHubError;
use ondushub_domain::id::AccessoryId;

/// Stores registered accessories and their last known characteristic values.
pub trait AccessoryRepository {
    /// Insert a new accessory.
    fn create(
        &self,
        accessory: Accessory,
    ) -> impl Future<Output = Result<Accessory, OndusHubError>> + Send;

    /// Fetch an accessory by id.
    fn get_by_id(
        &self,
        id: AccessoryId,
    ) -> impl Future<Output = Result<Option<Accessory>, OndusHubError>> + Send;

    /// Fetch an accessory by its vendor unique id.
    fn find_by_unique_id(
        &self,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<Accessory>, OndusHubError>> + Send;

    /// All accessories, ordered by display name.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Accessory>, OndusHubError>> + Send;

    /// Replace an existing accessory.
    ///
    /// Returns [`OndusHubError::NotFound`] when the accessory is unknown.
    fn update(
        &self,
        accessory: Accessory,
    ) -> impl Future<Output = Result<Accessory, OndusHubError>> + Send;
}
