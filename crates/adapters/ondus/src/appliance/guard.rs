//! Sense Guard (103) water shutoff valve controller.

use std::sync::Arc;

use tokio::sync::Mutex;

use ondushub_app::ports::PlatformContext;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::{OndusHubError, ValidationError};
use ondushub_domain::service::{Service, ServiceKind};
use ondushub_domain::time::today;

use crate::api::{ApplianceInfo, ValveCommand};
use crate::error::OndusError;
use crate::session::{ApplianceRef, OndusSession};

use super::sensor::{self, TimeKey};
use super::{ApplianceBase, ApplianceKind, read_only};

#[derive(Debug)]
struct GuardState {
    temperature: f64,
    valve_open: bool,
    flowrate: f64,
    pressure: f64,
    date: String,
    wifi_quality: f64,
    connection: f64,
}

impl Default for GuardState {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            valve_open: true,
            flowrate: 0.0,
            pressure: 0.0,
            date: String::new(),
            wifi_quality: 0.0,
            connection: 0.0,
        }
    }
}

/// Controller for a Sense Guard.
pub struct SenseGuard<C> {
    base: ApplianceBase<C>,
    valve_control: bool,
    state: Mutex<GuardState>,
}

impl<C: PlatformContext> SenseGuard<C> {
    pub(crate) fn new(
        target: ApplianceRef,
        info: ApplianceInfo,
        session: Arc<OndusSession>,
        ctx: C,
        valve_control: bool,
        history: bool,
    ) -> Result<Self, OndusHubError> {
        let valve = Service::new(ServiceKind::Valve)
            .with(Characteristic::Active, CharacteristicValue::active(true))
            .with(Characteristic::InUse, CharacteristicValue::in_use(true))
            .with(Characteristic::ValveType, CharacteristicValue::GENERIC_VALVE)
            .with(Characteristic::StatusActive, true)
            .with(Characteristic::StatusFault, CharacteristicValue::fault(false));
        let services = vec![sensor::temperature_service(), sensor::leak_service(), valve];
        let base = ApplianceBase::new(
            ApplianceKind::SenseGuard,
            target,
            info,
            session,
            ctx,
            services,
            history,
        )?;
        if !valve_control {
            tracing::info!(appliance = %base.name(), "valve control is disabled");
        }
        Ok(Self {
            base,
            valve_control,
            state: Mutex::new(GuardState::default()),
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
        match (service, characteristic) {
            (ServiceKind::LeakSensor, Characteristic::LeakDetected) => {
                let temperature = self.state.lock().await.temperature;
                let leak = sensor::read_leak(&self.base, temperature, None).await?;
                Ok(CharacteristicValue::leak(leak))
            }
            (ServiceKind::TemperatureSensor, Characteristic::CurrentTemperature) => {
                self.fetch_measurements().await.map(CharacteristicValue::from)
            }
            (ServiceKind::Valve, Characteristic::Active) => self.read_valve().await,
            (ServiceKind::Valve, Characteristic::InUse) => {
                let flowrate = self.state.lock().await.flowrate;
                Ok(CharacteristicValue::in_use(flowrate > 0.0))
            }
            _ => self.base.cached(service, characteristic).await,
        }
    }

    pub(crate) async fn write(
        &self,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<(), OndusError> {
        match (service, characteristic) {
            (ServiceKind::Valve, Characteristic::Active) => {
                let open = value.as_bool().ok_or_else(|| {
                    OndusError::Domain(ValidationError::InvalidValue(characteristic).into())
                })?;
                self.write_valve(open).await
            }
            _ => Err(read_only(service, characteristic)),
        }
    }

    pub(crate) async fn poll(&self) {
        if let Err(err) = self.fetch_measurements().await {
            tracing::error!(appliance = %self.base.name(), %err, "unable to update measurements");
        }
        if let Err(err) = self.fetch_status().await {
            tracing::error!(appliance = %self.base.name(), %err, "unable to update device status");
        }
    }

    /// Fetch today's measurements and apply the latest one, returning the
    /// current temperature.
    pub(crate) async fn fetch_measurements(&self) -> Result<f64, OndusError> {
        let measurement = match self
            .base
            .latest_measurement(Some(today()), TimeKey::Date)
            .await
        {
            Ok(measurement) => measurement,
            Err(err) => {
                self.base
                    .publish(
                        ServiceKind::TemperatureSensor,
                        Characteristic::StatusActive,
                        false.into(),
                    )
                    .await;
                return Err(err);
            }
        };

        let temperature = {
            let mut state = self.state.lock().await;
            state.date = measurement.date.unwrap_or_default();
            state.flowrate = measurement.flowrate.unwrap_or(state.flowrate);
            state.pressure = measurement.pressure.unwrap_or(state.pressure);
            state.temperature = measurement
                .temperature_guard
                .unwrap_or(state.temperature);
            tracing::info!(
                appliance = %self.base.name(),
                date = %state.date,
                "Temperature: {}˚C, flowrate: {}, pressure: {} bar",
                state.temperature,
                state.flowrate,
                state.pressure,
            );
            state.temperature
        };

        self.base
            .publish(
                ServiceKind::TemperatureSensor,
                Characteristic::CurrentTemperature,
                temperature.into(),
            )
            .await;
        self.base
            .publish(
                ServiceKind::TemperatureSensor,
                Characteristic::StatusActive,
                true.into(),
            )
            .await;
        Ok(temperature)
    }

    async fn fetch_status(&self) -> Result<(), OndusError> {
        let entries = self.base.session().status(self.base.target()).await?;
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
            valve_open = state.valve_open,
            "device status updated"
        );
        Ok(())
    }

    async fn read_valve(&self) -> Result<CharacteristicValue, OndusError> {
        let response = match self.base.session().command(self.base.target()).await {
            Ok(response) => response,
            Err(err) => {
                self.set_valve_reachable(false).await;
                return Err(err);
            }
        };
        let open = response.command.valve_open;
        self.state.lock().await.valve_open = open;
        tracing::debug!(appliance = %self.base.name(), valve_open = open, "valve state");

        self.base
            .publish(
                ServiceKind::Valve,
                Characteristic::Active,
                CharacteristicValue::active(open),
            )
            .await;
        self.base
            .publish(
                ServiceKind::Valve,
                Characteristic::InUse,
                CharacteristicValue::in_use(open),
            )
            .await;
        self.set_valve_reachable(true).await;
        Ok(CharacteristicValue::active(open))
    }

    async fn write_valve(&self, open: bool) -> Result<(), OndusError> {
        let action = if open { "open" } else { "close" };
        if !self.valve_control {
            tracing::warn!(
                appliance = %self.base.name(),
                "refusing to {action} valve, valve control is disabled"
            );
            return Ok(());
        }

        tracing::warn!(appliance = %self.base.name(), "request to {action} valve");
        self.base
            .publish(
                ServiceKind::Valve,
                Characteristic::Active,
                CharacteristicValue::active(open),
            )
            .await;

        let response = match self
            .base
            .session()
            .set_command(self.base.target(), &ValveCommand::new(open))
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.set_valve_reachable(false).await;
                return Err(err);
            }
        };
        let valve_open = response.command.valve_open;
        self.state.lock().await.valve_open = valve_open;
        tracing::warn!(
            appliance = %self.base.name(),
            "valve has been {}",
            if valve_open { "opened" } else { "closed" }
        );

        self.base
            .publish(
                ServiceKind::Valve,
                Characteristic::InUse,
                CharacteristicValue::in_use(valve_open),
            )
            .await;
        self.set_valve_reachable(true).await;
        Ok(())
    }

    async fn set_valve_reachable(&self, reachable: bool) {
        self.base
            .publish(ServiceKind::Valve, Characteristic::StatusActive, reachable.into())
            .await;
    }
}
