//! Appliance controllers.
//!
//! One controller per discovered appliance. A controller owns the local
//! copy of its accessory, answers characteristic reads and writes, and
//! refreshes its state when polled.

pub mod guard;
pub mod sense;
pub mod sensor;
pub mod tap;

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, RwLock};

use ondushub_app::ports::PlatformContext;
use ondushub_domain::accessory::Accessory;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::{NotFoundError, OndusHubError, ValidationError};
use ondushub_domain::event::Event;
use ondushub_domain::history::HistoryEntry;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::service::{Service, ServiceKind};
use ondushub_domain::time::now;

use crate::api::{ApplianceInfo, Measurement};
use crate::config::OndusConfig;
use crate::error::OndusError;
use crate::session::{ApplianceRef, OndusSession};
use crate::thresholds::Thresholds;

use self::guard::SenseGuard;
use self::sense::Sense;
use self::sensor::TimeKey;
use self::tap::Tap;

pub const MANUFACTURER: &str = "Grohe AG";

/// App Store id of the vendor app, advertised in the accessory information.
pub const APP_MATCHING_IDENTIFIER: &str = "1451814256";

/// Appliance families, keyed by the vendor type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplianceKind {
    /// Battery powered leak and climate sensor.
    Sense,
    /// Mains powered leak and climate sensor.
    SensePlus,
    /// Water shutoff valve controller.
    SenseGuard,
    /// Carbonated water tap.
    Blue,
    /// Hot water tap.
    Red,
}

impl ApplianceKind {
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            101 => Some(Self::Sense),
            102 => Some(Self::SensePlus),
            103 => Some(Self::SenseGuard),
            104 => Some(Self::Blue),
            105 => Some(Self::Red),
            _ => None,
        }
    }

    /// Model name reported in the accessory information.
    #[must_use]
    pub fn model(self) -> &'static str {
        match self {
            Self::Sense => "Sense",
            Self::SensePlus => "Sense Plus",
            Self::SenseGuard => "Sense Guard",
            Self::Blue => "Sense Blue",
            Self::Red => "Sense Red",
        }
    }
}

/// Decode a hex string into characters (`"4142"` → `"AB"`).
///
/// Input that is not an even number of hex digits is returned unchanged.
#[must_use]
pub fn unhexlify(input: &str) -> String {
    if input.len() % 2 != 0 {
        return input.to_string();
    }
    let decoded: Option<String> = input
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .map(char::from)
        })
        .collect();
    decoded.unwrap_or_else(|| input.to_string())
}

/// State and plumbing shared by every controller.
pub struct ApplianceBase<C> {
    kind: ApplianceKind,
    target: ApplianceRef,
    id: AccessoryId,
    name: String,
    session: Arc<OndusSession>,
    ctx: C,
    accessory: Mutex<Accessory>,
    info: RwLock<ApplianceInfo>,
    thresholds: RwLock<Thresholds>,
    history: bool,
}

impl<C: PlatformContext> ApplianceBase<C> {
    /// Build the accessory for an appliance from its info and the
    /// controller-specific services. With `history` set, every fetched
    /// measurement is recorded with the host.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::Validation`] when the appliance has no name
    /// or id.
    pub fn new(
        kind: ApplianceKind,
        target: ApplianceRef,
        info: ApplianceInfo,
        session: Arc<OndusSession>,
        ctx: C,
        services: Vec<Service>,
        history: bool,
    ) -> Result<Self, OndusHubError> {
        let information = Service::new(ServiceKind::AccessoryInformation)
            .with(Characteristic::Manufacturer, MANUFACTURER)
            .with(Characteristic::Model, kind.model())
            .with(Characteristic::Name, info.name.as_str())
            .with(Characteristic::HardwareRevision, info.kind.to_string())
            .with(Characteristic::SerialNumber, unhexlify(&info.serial_number))
            .with(Characteristic::FirmwareRevision, info.version.as_str())
            .with(Characteristic::AppMatchingIdentifier, APP_MATCHING_IDENTIFIER);

        let mut builder = Accessory::builder()
            .unique_id(info.appliance_id.as_str())
            .display_name(info.name.as_str())
            .platform(crate::PLATFORM_NAME)
            .context(serde_json::to_value(&info).unwrap_or_default())
            .service(information);
        for service in services {
            builder = builder.service(service.with(Characteristic::Name, info.name.as_str()));
        }
        let accessory = builder.build()?;

        Ok(Self {
            kind,
            target,
            id: accessory.id,
            name: info.name.clone(),
            session,
            ctx,
            accessory: Mutex::new(accessory),
            thresholds: RwLock::new(Thresholds::parse(&info)),
            info: RwLock::new(info),
            history,
        })
    }

    pub fn kind(&self) -> ApplianceKind {
        self.kind
    }

    pub fn id(&self) -> AccessoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &ApplianceRef {
        &self.target
    }

    pub fn session(&self) -> &OndusSession {
        &self.session
    }

    pub async fn info(&self) -> ApplianceInfo {
        self.info.read().await.clone()
    }

    pub async fn thresholds(&self) -> Thresholds {
        *self.thresholds.read().await
    }

    /// Current local copy of the accessory.
    pub async fn snapshot(&self) -> Accessory {
        self.accessory.lock().await.clone()
    }

    /// Register the accessory with the host and adopt the id it assigns.
    ///
    /// # Errors
    ///
    /// Propagates the registration error from the host.
    pub async fn register(&self) -> Result<(), OndusHubError> {
        let accessory = self.snapshot().await;
        let registered = self.ctx.register_accessory(accessory).await?;
        *self.accessory.lock().await = registered;
        Ok(())
    }

    /// Re-fetch the appliance info and re-parse thresholds. On failure the
    /// previous info is kept.
    pub async fn refresh_info(&self) {
        tracing::debug!(appliance = %self.name, "updating appliance info");
        match self.session.appliance_info(&self.target).await {
            Ok(info) => {
                *self.thresholds.write().await = Thresholds::parse(&info);
                *self.info.write().await = info;
            }
            Err(err) => {
                tracing::error!(appliance = %self.name, %err, "unable to update appliance info");
            }
        }
    }

    /// Update a characteristic locally and push it to the host.
    pub async fn publish(
        &self,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        let updated =
            self.accessory
                .lock()
                .await
                .update_characteristic(service, characteristic, value.clone(), now());
        if let Err(err) = updated {
            tracing::warn!(appliance = %self.name, %err, %service, %characteristic, "characteristic not exposed");
            return;
        }
        if let Err(err) = self
            .ctx
            .update_characteristic(self.id, service, characteristic, value)
            .await
        {
            tracing::warn!(appliance = %self.name, %err, "failed to push characteristic update");
        }
    }

    /// Publish a domain event for this appliance.
    pub async fn publish_event(&self, event: Event) {
        if let Err(err) = self.ctx.publish(event).await {
            tracing::warn!(appliance = %self.name, %err, "failed to publish event");
        }
    }

    /// Last known value of a characteristic.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::NotFound`] when the accessory does not expose
    /// the characteristic.
    pub async fn cached(
        &self,
        service: ServiceKind,
        characteristic: Characteristic,
    ) -> Result<CharacteristicValue, OndusError> {
        self.accessory
            .lock()
            .await
            .characteristic(service, characteristic)
            .cloned()
            .ok_or_else(|| {
                OndusError::Domain(
                    NotFoundError {
                        entity: "Characteristic",
                        id: format!("{}/{service}/{characteristic}", self.id),
                    }
                    .into(),
                )
            })
    }

    /// Fetch measurements starting at `from` and return the latest one.
    ///
    /// # Errors
    ///
    /// Returns [`OndusError::NoMeasurements`] when the response holds no data
    /// points, or the session error.
    pub async fn latest_measurement(
        &self,
        from: Option<NaiveDate>,
        key: TimeKey,
    ) -> Result<Measurement, OndusError> {
        let measurements = self
            .session
            .measurements(&self.target, from)
            .await?
            .into_measurements();
        tracing::debug!(
            appliance = %self.name,
            count = measurements.len(),
            "retrieved measurements, picking latest"
        );
        self.record_history(&measurements, key).await;
        sensor::latest(measurements, key).ok_or(OndusError::NoMeasurements)
    }

    /// Record the whole measurement series available in the cloud. Does
    /// nothing unless history is enabled.
    pub async fn replay_history(&self, key: TimeKey) {
        if !self.history {
            return;
        }
        tracing::info!(appliance = %self.name, "replaying measurement history");
        match self.session.measurements(&self.target, None).await {
            Ok(response) => {
                self.record_history(&response.into_measurements(), key).await;
            }
            Err(err) => {
                tracing::error!(appliance = %self.name, %err, "unable to retrieve historical measurements");
            }
        }
    }

    async fn record_history(&self, measurements: &[Measurement], key: TimeKey) {
        if !self.history {
            return;
        }
        let entries: Vec<HistoryEntry> = measurements
            .iter()
            .filter_map(|m| {
                let at = key.of(m).and_then(sensor::parse_timestamp)?;
                Some(
                    HistoryEntry::builder(self.id, at)
                        .temperature(m.temperature.or(m.temperature_guard))
                        .humidity(m.humidity)
                        .flowrate(m.flowrate)
                        .pressure(m.pressure)
                        .build(),
                )
            })
            .collect();
        let count = entries.len();
        match self.ctx.record_history(entries).await {
            Ok(()) => tracing::debug!(appliance = %self.name, count, "recorded measurement history"),
            Err(err) => tracing::warn!(appliance = %self.name, %err, "failed to record measurement history"),
        }
    }
}

/// Error for writes to characteristics that cannot be written.
pub(crate) fn read_only(service: ServiceKind, characteristic: Characteristic) -> OndusError {
    OndusError::Domain(
        ValidationError::ReadOnly {
            service,
            characteristic,
        }
        .into(),
    )
}

/// A controller of any supported kind.
pub enum Appliance<C> {
    Sense(Sense<C>),
    Guard(SenseGuard<C>),
    Tap(Tap<C>),
}

impl<C: PlatformContext> Appliance<C> {
    /// Build the controller matching `info.kind`. Returns `Ok(None)` for
    /// unsupported type codes.
    ///
    /// # Errors
    ///
    /// Returns [`OndusHubError::Validation`] when the appliance info cannot be
    /// turned into a valid accessory.
    pub fn new(
        location_id: i64,
        room_id: i64,
        info: ApplianceInfo,
        session: Arc<OndusSession>,
        ctx: C,
        config: &OndusConfig,
    ) -> Result<Option<Self>, OndusHubError> {
        let Some(kind) = ApplianceKind::from_code(info.kind) else {
            tracing::warn!(
                kind = info.kind,
                name = %info.name,
                "unsupported appliance type, ignoring"
            );
            return Ok(None);
        };
        tracing::info!(model = kind.model(), name = %info.name, "opening appliance handler");
        let target = ApplianceRef {
            location_id,
            room_id,
            appliance_id: info.appliance_id.clone(),
        };
        let appliance = match kind {
            ApplianceKind::Sense | ApplianceKind::SensePlus => Self::Sense(Sense::new(
                kind,
                target,
                info,
                session,
                ctx,
                config.history,
            )?),
            ApplianceKind::SenseGuard => Self::Guard(SenseGuard::new(
                target,
                info,
                session,
                ctx,
                config.valve_control,
                config.history,
            )?),
            ApplianceKind::Blue | ApplianceKind::Red => {
                Self::Tap(Tap::new(kind, target, info, session, ctx)?)
            }
        };
        Ok(Some(appliance))
    }

    pub fn base(&self) -> &ApplianceBase<C> {
        match self {
            Self::Sense(inner) => inner.base(),
            Self::Guard(inner) => inner.base(),
            Self::Tap(inner) => inner.base(),
        }
    }

    /// Characteristic GET.
    ///
    /// # Errors
    ///
    /// Returns the API error when a live value could not be fetched, or
    /// [`OndusHubError::NotFound`] for characteristics the accessory lacks.
    pub async fn read(
        &self,
        service: ServiceKind,
        characteristic: Characteristic,
    ) -> Result<CharacteristicValue, OndusError> {
        tracing::debug!(appliance = %self.base().name(), %service, %characteristic, "GET");
        match self {
            Self::Sense(inner) => inner.read(service, characteristic).await,
            Self::Guard(inner) => inner.read(service, characteristic).await,
            Self::Tap(inner) => inner.read(service, characteristic).await,
        }
    }

    /// Characteristic SET.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ReadOnly`] for characteristics that cannot
    /// be written, or the API error.
    pub async fn write(
        &self,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<(), OndusError> {
        tracing::debug!(appliance = %self.base().name(), %service, %characteristic, ?value, "SET");
        match self {
            Self::Sense(_) | Self::Tap(_) => Err(read_only(service, characteristic)),
            Self::Guard(inner) => inner.write(service, characteristic, value).await,
        }
    }

    /// Record the measurement history kept in the cloud. Taps report no
    /// measurements.
    pub async fn replay_history(&self) {
        match self {
            Self::Sense(inner) => inner.base().replay_history(TimeKey::Timestamp).await,
            Self::Guard(inner) => inner.base().replay_history(TimeKey::Date).await,
            Self::Tap(_) => {}
        }
    }

    /// Fetch fresh measurements and status.
    pub async fn poll(&self) {
        match self {
            Self::Sense(inner) => inner.poll().await,
            Self::Guard(inner) => inner.poll().await,
            Self::Tap(inner) => inner.poll().await,
        }
    }
}
