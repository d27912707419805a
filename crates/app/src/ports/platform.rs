//! Platform port — lifecycle and characteristic handlers for a vendor platform.
//!
//! A platform bridges a vendor cloud into the accessory model. It discovers
//! appliances on startup, registers one accessory per appliance, keeps the
//! accessories up to date from background pollers, and answers
//! characteristic GET/SET requests coming from the host.

use std::future::Future;

use ondushub_domain::accessory::Accessory;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::OndusHubError;
use ondushub_domain::event::Event;
use ondushub_domain::history::HistoryEntry;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::service::ServiceKind;

/// Host services a platform uses to publish what it discovers.
///
/// The binary crate provides a concrete implementation backed by
/// `AccessoryService`.
pub trait PlatformContext: Send + Sync {
    /// Register an accessory, replacing it when its unique id is already
    /// known. The returned accessory carries the id assigned by the host.
    fn register_accessory(
        &self,
        accessory: Accessory,
    ) -> impl Future<Output = Result<Accessory, OndusHubError>> + Send;

    /// Push a new characteristic value to the host.
    fn update_characteristic(
        &self,
        id: AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> impl Future<Output = Result<(), OndusHubError>> + Send;

    /// Publish a domain event to the event bus.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), OndusHubError>> + Send;

    /// Add measurement samples to the accessory history.
    fn record_history(
        &self,
        entries: Vec<HistoryEntry>,
    ) -> impl Future<Output = Result<(), OndusHubError>> + Send;
}

/// A vendor platform.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup) — authenticate, discover and register accessories
/// 2. [`start_background`](Self::start_background) — spawn token refresh and pollers
/// 3. (the server runs, forwarding GET/SET requests to
///    [`read_characteristic`](Self::read_characteristic) and
///    [`write_characteristic`](Self::write_characteristic))
/// 4. [`teardown`](Self::teardown) — stop background tasks
pub trait Platform: Send + Sync {
    /// Unique name identifying this platform (e.g. `"ondus"`).
    fn name(&self) -> &'static str;

    /// Authenticate and register every discovered accessory.
    fn setup(&mut self) -> impl Future<Output = Result<(), OndusHubError>> + Send;

    /// Spawn long-running background tasks and return immediately.
    fn start_background(&self) -> impl Future<Output = Result<(), OndusHubError>> + Send {
        async { Ok(()) }
    }

    /// Characteristic GET handler. May call the vendor cloud to fetch a
    /// fresh value.
    fn read_characteristic(
        &self,
        id: AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
    ) -> impl Future<Output = Result<CharacteristicValue, OndusHubError>> + Send;

    /// Characteristic SET handler.
    fn write_characteristic(
        &self,
        id: AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> impl Future<Output = Result<(), OndusHubError>> + Send;

    /// Called on graceful shutdown.
    fn teardown(&self) -> impl Future<Output = Result<(), OndusHubError>> + Send;
}
