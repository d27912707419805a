//! Sense (101) and Sense Plus (102) leak and climate sensors.

use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta};
use tokio::sync::Mutex;

use ondushub_app::ports::PlatformContext;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::OndusHubError;
use ondushub_domain::service::{Service, ServiceKind};
use ondushub_domain::time::now;

use crate::api::ApplianceInfo;
use crate::error::OndusError;
use crate::session::{ApplianceRef, OndusSession};

use super::sensor::{self, TimeKey};
use super::{ApplianceBase, ApplianceKind};

/// Battery level at or below which the battery is reported low.
pub const LOW_BATTERY_LEVEL: i64 = 10;

#[derive(Debug, Default)]
struct SenseState {
    temperature: f64,
    humidity: f64,
    battery_level: i64,
    wifi_quality: f64,
    connection: f64,
    timestamp: String,
}

/// Controller for a Sense or Sense Plus.
pub struct Sense<C> {
    base: ApplianceBase<C>,
    /// Sense Plus is mains powered: no battery service, and measurement
    /// health is reported through `StatusActive` instead of `StatusFault`.
    plus: bool,
    state: Mutex<SenseState>,
}

impl<C: PlatformContext> Sense<C> {
    pub(crate) fn new(
        kind: ApplianceKind,
        target: ApplianceRef,
        info: ApplianceInfo,
        session: Arc<OndusSession>,
        ctx: C,
        history: bool,
    ) -> Result<Self, OndusHubError> {
        let plus = kind == ApplianceKind::SensePlus;
        let mut services = vec![
            sensor::temperature_service(),
            Service::new(ServiceKind::HumiditySensor)
                .with(Characteristic::CurrentRelativeHumidity, 0.0)
                .with(Characteristic::StatusActive, true)
                .with(Characteristic::StatusFault, CharacteristicValue::fault(false)),
            sensor::leak_service(),
        ];
        if !plus {
            services.push(
                Service::new(ServiceKind::Battery)
                    .with(Characteristic::BatteryLevel, 0_i64)
                    .with(Characteristic::StatusLowBattery, CharacteristicValue::low_battery(false))
                    .with(Characteristic::ChargingState, CharacteristicValue::NOT_CHARGEABLE)
                    .with(Characteristic::StatusFault, CharacteristicValue::fault(false)),
            );
        }
        let base = ApplianceBase::new(kind, target, info, session, ctx, services, history)?;
        Ok(Self {
            base,
            plus,
            state: Mutex::new(SenseState::default()),
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
                let (temperature, battery) = {
                    let state = self.state.lock().await;
                    let battery = (!self.plus).then_some(state.battery_level);
                    (state.temperature, battery)
                };
                let leak = sensor::read_leak(&self.base, temperature, battery).await?;
                Ok(CharacteristicValue::leak(leak))
            }
            (ServiceKind::TemperatureSensor, Characteristic::CurrentTemperature) => {
                Ok(self.state.lock().await.temperature.into())
            }
            (ServiceKind::HumiditySensor, Characteristic::CurrentRelativeHumidity) => {
                Ok(self.state.lock().await.humidity.into())
            }
            (ServiceKind::Battery, Characteristic::BatteryLevel) if !self.plus => {
                Ok(self.state.lock().await.battery_level.into())
            }
            (ServiceKind::Battery, Characteristic::StatusLowBattery) if !self.plus => {
                let level = self.state.lock().await.battery_level;
                Ok(CharacteristicValue::low_battery(level <= LOW_BATTERY_LEVEL))
            }
            _ => self.base.cached(service, characteristic).await,
        }
    }

    pub(crate) async fn poll(&self) {
        if let Err(err) = self.fetch_measurements().await {
            tracing::error!(appliance = %self.base.name(), %err, "unable to update temperature and humidity");
        }
        if let Err(err) = self.fetch_status().await {
            tracing::error!(appliance = %self.base.name(), %err, "unable to update device status");
        }
    }

    /// Date to fetch measurements from: the day of the last data the
    /// appliance pushed, if known.
    async fn measurements_from(&self) -> Option<NaiveDate> {
        let tdt = self.base.info().await.tdt?;
        let Some(last) = sensor::parse_timestamp(&tdt) else {
            tracing::warn!(appliance = %self.base.name(), %tdt, "unparseable last data timestamp");
            return None;
        };
        let age = now() - last;
        if age > TimeDelta::days(1) {
            let days = (age.num_seconds() + 43_200) / 86_400;
            tracing::warn!(appliance = %self.base.name(), "Retrieved data is {days} day(s) old!");
        }
        Some(last.date_naive())
    }

    pub(crate) async fn fetch_measurements(&self) -> Result<(), OndusError> {
        let from = self.measurements_from().await;
        let measurement = match self.base.latest_measurement(from, TimeKey::Timestamp).await {
            Ok(measurement) => measurement,
            Err(err) => {
                self.report_health(false).await;
                return Err(err);
            }
        };

        let (temperature, humidity) = {
            let mut state = self.state.lock().await;
            state.timestamp = measurement.timestamp.unwrap_or_default();
            state.temperature = measurement.temperature.unwrap_or(state.temperature);
            state.humidity = measurement.humidity.unwrap_or(state.humidity);
            tracing::info!(
                appliance = %self.base.name(),
                timestamp = %state.timestamp,
                "Temperature: {}˚C, humidity: {}% RF",
                state.temperature,
                state.humidity,
            );
            (state.temperature, state.humidity)
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
                ServiceKind::HumiditySensor,
                Characteristic::CurrentRelativeHumidity,
                humidity.into(),
            )
            .await;
        self.report_health(true).await;
        Ok(())
    }

    async fn report_health(&self, healthy: bool) {
        let (characteristic, value) = if self.plus {
            (Characteristic::StatusActive, CharacteristicValue::Bool(healthy))
        } else {
            (Characteristic::StatusFault, CharacteristicValue::fault(!healthy))
        };
        for service in [ServiceKind::TemperatureSensor, ServiceKind::HumiditySensor] {
            self.base.publish(service, characteristic, value.clone()).await;
        }
    }

    pub(crate) async fn fetch_status(&self) -> Result<(), OndusError> {
        let entries = match self.base.session().status(self.base.target()).await {
            Ok(entries) => entries,
            Err(err) => {
                if !self.plus {
                    self.base
                        .publish(
                            ServiceKind::Battery,
                            Characteristic::StatusFault,
                            CharacteristicValue::fault(true),
                        )
                        .await;
                }
                return Err(err);
            }
        };

        let battery_level = {
            let mut state = self.state.lock().await;
            for entry in &entries {
                match entry.kind.as_str() {
                    "battery" => state.battery_level = round(entry.value),
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
            state.battery_level
        };

        if !self.plus {
            tracing::info!(appliance = %self.base.name(), "Battery: {battery_level}%");
            self.base
                .publish(ServiceKind::Battery, Characteristic::BatteryLevel, battery_level.into())
                .await;
            self.base
                .publish(
                    ServiceKind::Battery,
                    Characteristic::StatusLowBattery,
                    CharacteristicValue::low_battery(battery_level <= LOW_BATTERY_LEVEL),
                )
                .await;
            self.base
                .publish(
                    ServiceKind::Battery,
                    Characteristic::StatusFault,
                    CharacteristicValue::fault(false),
                )
                .await;
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> i64 {
    value.round() as i64
}
