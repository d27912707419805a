//! # ondushub-adapter-ondus
//!
//! Ondus cloud platform — bridges Grohe Sense, Sense Plus, Sense Guard,
//! Blue and Red appliances into ondushub accessories.
//!
//! ## How it works
//!
//! On setup the platform authenticates (refresh token, or username and
//! password through the login form), walks locations → rooms → appliances
//! and registers one accessory per supported appliance. In the background a
//! token refresh loop keeps the session alive and one poller per appliance
//! fetches measurements and status. Characteristic GETs that need live data
//! (leak, valve, Sense Guard temperature) call the cloud directly.
//!
//! ## Supported appliances
//!
//! | Type code | Appliance | Services |
//! |-----------|-----------|----------|
//! | 101 | Sense | temperature, humidity, leak, battery |
//! | 102 | Sense Plus | temperature, humidity, leak |
//! | 103 | Sense Guard | temperature, leak, valve |
//! | 104 | Blue | switch |
//! | 105 | Red | switch |
//!
//! ## Dependency rule
//!
//! Depends on `ondushub-app` and `ondushub-domain` only.

pub mod api;
pub mod appliance;
mod config;
mod error;
mod login;
pub mod notification;
mod poller;
pub mod session;
pub mod thresholds;

pub use config::{DEFAULT_BASE_URL, DEFAULT_REFRESH_INTERVAL_SECS, OndusConfig};
pub use error::OndusError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use ondushub_app::ports::{Platform, PlatformContext};
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::{NotFoundError, OndusHubError};
use ondushub_domain::id::AccessoryId;
use ondushub_domain::service::ServiceKind;

use crate::appliance::Appliance;
use crate::poller::Poller;
use crate::session::{DEFAULT_TOKEN_LIFETIME, OndusSession, refresh_delay};

/// Name the platform registers its accessories under.
pub const PLATFORM_NAME: &str = "ondus";

/// The Ondus platform.
pub struct OndusPlatform<C> {
    config: OndusConfig,
    ctx: C,
    session: Arc<OndusSession>,
    appliances: HashMap<AccessoryId, Arc<Appliance<C>>>,
    token_lifetime: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C> OndusPlatform<C>
where
    C: PlatformContext + Clone + 'static,
{
    /// Create the platform. Nothing is contacted until [`Platform::setup`].
    ///
    /// # Errors
    ///
    /// Returns [`OndusError::MissingCredentials`] when neither a refresh
    /// token nor a username and password are configured, or
    /// [`OndusError::InvalidUrl`] for a malformed base URL.
    pub fn new(config: OndusConfig, ctx: C) -> Result<Self, OndusError> {
        let session = OndusSession::new(&config)?;
        Ok(Self {
            config,
            ctx,
            session: Arc::new(session),
            appliances: HashMap::new(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Ids of the accessories registered during setup.
    #[must_use]
    pub fn accessory_ids(&self) -> Vec<AccessoryId> {
        self.appliances.keys().copied().collect()
    }

    /// The authenticated session.
    #[must_use]
    pub fn session(&self) -> &Arc<OndusSession> {
        &self.session
    }

    fn appliance(&self, id: AccessoryId) -> Result<&Arc<Appliance<C>>, OndusHubError> {
        self.appliances.get(&id).ok_or_else(|| {
            NotFoundError {
                entity: "Accessory",
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn discover(&mut self) -> Result<(), OndusHubError> {
        for location in self.session.locations().await? {
            tracing::debug!(location_id = location.id, name = %location.name, "found location");
            for room in self.session.rooms(location.id).await? {
                tracing::debug!(room_id = room.id, name = %room.name, "found room");
                for info in self.session.appliances(location.id, room.id).await? {
                    let Some(appliance) = Appliance::new(
                        location.id,
                        room.id,
                        info,
                        Arc::clone(&self.session),
                        self.ctx.clone(),
                        &self.config,
                    )?
                    else {
                        continue;
                    };
                    appliance.base().register().await?;
                    self.appliances
                        .insert(appliance.base().id(), Arc::new(appliance));
                }
            }
        }
        Ok(())
    }
}

impl<C> Platform for OndusPlatform<C>
where
    C: PlatformContext + Clone + 'static,
{
    fn name(&self) -> &'static str {
        PLATFORM_NAME
    }

    async fn setup(&mut self) -> Result<(), OndusHubError> {
        tracing::info!(base_url = %self.config.base_url, "logging in to Ondus");
        self.token_lifetime = self.session.login().await?;
        self.discover().await?;
        tracing::info!(count = self.appliances.len(), "Ondus discovery complete");
        Ok(())
    }

    async fn start_background(&self) -> Result<(), OndusHubError> {
        let interval = Duration::from_secs(self.config.effective_refresh_interval_secs());
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(
            self.session
                .spawn_refresh_loop(refresh_delay(self.token_lifetime)),
        );
        for appliance in self.appliances.values() {
            tasks.push(Poller::new(Arc::clone(appliance)).spawn(interval));
        }
        tracing::info!(
            pollers = self.appliances.len(),
            interval_secs = interval.as_secs(),
            "Ondus background tasks started"
        );
        Ok(())
    }

    async fn read_characteristic(
        &self,
        id: AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
    ) -> Result<CharacteristicValue, OndusHubError> {
        let appliance = self.appliance(id)?;
        Ok(appliance.read(service, characteristic).await?)
    }

    async fn write_characteristic(
        &self,
        id: AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<(), OndusHubError> {
        let appliance = self.appliance(id)?;
        Ok(appliance.write(service, characteristic, value).await?)
    }

    async fn teardown(&self) -> Result<(), OndusHubError> {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in &tasks {
            task.abort();
        }
        tracing::info!(tasks = tasks.len(), "Ondus platform stopped");
        Ok(())
    }
}
