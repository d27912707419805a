//! Blue (104) and Red (105) tap units.
//!
//! Taps only expose their reachability. Dispensing is not controllable.

use std::sync::Arc;

use tokio::sync::Mutex;

use ondushub_app::ports::PlatformContext;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::OndusHubError;
use ondushub_domain::service::{Service, ServiceKind};

use crate::api::ApplianceInfo;
use crate::error::OndusError;
use crate::session::{ApplianceRef, OndusSession};

use super::{ApplianceBase, ApplianceKind};

#[derive(Debug, Default)]
struct TapState {
    wifi_quality: f64,
    connection: f64,
}

/// Controller for a Blue or Red tap.
pub struct Tap<C> {
    base: ApplianceBase<C>,
    state: Mutex<TapState>,
}

impl<C: PlatformContext> Tap<C> {
    pub(crate) fn new(
        kind: ApplianceKind,
        target: ApplianceRef,
        info: ApplianceInfo,
        session: Arc<OndusSession>,
        ctx: C,
    ) -> Result<Self, OndusHubError> {
        let switch = Service::new(ServiceKind::Switch)
            .with(Characteristic::On, false)
            .with(Characteristic::StatusActive, true)
            .with(Characteristic::StatusFault, CharacteristicValue::fault(false));
        let base = ApplianceBase::new(kind, target, info, session, ctx, vec![switch], false)?;
        Ok(Self {
            base,
            state: Mutex::new(TapState::default()),
        })
    }

    pub fn base(&self) -> &ApplianceBase<C> {
        &self.base
    }

    pub(crate) async fn read(
        &self,
        service: ServiceKind,
        characteristic: Characteristic,
    ) -> Result<CharacteristicValue, OndusError> {
        self.base.cached(service, characteristic).await
    }

    pub(crate) async fn poll(&self) {
        if let Err(err) = self.fetch_status().await {
            tracing::error!(appliance = %self.base.name(), %err, "unable to update device status");
        }
    }

    async fn fetch_status(&self) -> Result<(), OndusError> {
        let entries = self.base.session().status(self.base.target()).await?;
        let connected = {
            let mut state = self.state.lock().await;
            for entry in &entries {
                match entry.kind.as_str() {
                    "wifi_quality" => state.wifi_quality = entry.value,
                    "connection" => state.connection = entry.value,
                    _ => {}
                }
            }
            tracing::info!(
                appliance = %self.base.name(),
                wifi_quality = state.wifi_quality,
                connection = state.connection,
                "device status updated"
            );
            state.connection > 0.0
        };
        self.base
            .publish(ServiceKind::Switch, Characteristic::StatusActive, connected.into())
            .await;
        Ok(())
    }
}
