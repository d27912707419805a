//! Behaviour shared by the leak/climate sensors and the Sense Guard.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::json;

use ondushub_app::ports::PlatformContext;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::event::{Event, EventType};
use ondushub_domain::service::{Service, ServiceKind};

use crate::api::Measurement;
use crate::error::OndusError;
use crate::notification::{self, Effect, MessageContext};

use super::ApplianceBase;

/// Which timestamp orders a measurement series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKey {
    /// `timestamp`, used by Sense and Sense Plus.
    Timestamp,
    /// `date`, used by Sense Guard.
    Date,
}

impl TimeKey {
    pub(crate) fn of(self, measurement: &Measurement) -> Option<&str> {
        match self {
            Self::Timestamp => measurement.timestamp.as_deref(),
            Self::Date => measurement.date.as_deref(),
        }
    }
}

/// Parse an Ondus timestamp. Values without an offset are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|ts| ts.and_utc())
        })
        .ok()
}

/// Latest measurement of a series. Timestamps that cannot be parsed sort
/// before parsed ones and are compared as text among themselves.
#[must_use]
pub fn latest(measurements: Vec<Measurement>, key: TimeKey) -> Option<Measurement> {
    measurements.into_iter().max_by(|a, b| {
        let (a, b) = (key.of(a), key.of(b));
        let parsed = (a.and_then(parse_timestamp), b.and_then(parse_timestamp));
        parsed.0.cmp(&parsed.1).then_with(|| a.cmp(&b))
    })
}

pub(crate) fn temperature_service() -> Service {
    Service::new(ServiceKind::TemperatureSensor)
        .with(Characteristic::CurrentTemperature, 0.0)
        .with(Characteristic::StatusActive, true)
        .with(Characteristic::StatusFault, CharacteristicValue::fault(false))
}

pub(crate) fn leak_service() -> Service {
    Service::new(ServiceKind::LeakSensor)
        .with(Characteristic::LeakDetected, CharacteristicValue::leak(false))
        .with(Characteristic::StatusActive, true)
        .with(Characteristic::StatusFault, CharacteristicValue::fault(false))
}

/// Leak GET: fetch notifications and derive the leak flag and sensor faults
/// from them. `temperature` and `battery_level` fill the notification texts.
///
/// # Errors
///
/// Returns the session error when notifications could not be fetched. The
/// leak service is marked inactive in that case.
pub(crate) async fn read_leak<C: PlatformContext>(
    base: &ApplianceBase<C>,
    temperature: f64,
    battery_level: Option<i64>,
) -> Result<bool, OndusError> {
    let notifications = match base.session().notifications(base.target()).await {
        Ok(notifications) => notifications,
        Err(err) => {
            base.publish(ServiceKind::LeakSensor, Characteristic::StatusActive, false.into())
                .await;
            return Err(err);
        }
    };

    let accessory = base.snapshot().await;
    let has_humidity = accessory.has_service(ServiceKind::HumiditySensor);
    let mut leak = false;
    for service in &accessory.services {
        if service.kind != ServiceKind::Battery && service.get(Characteristic::StatusFault).is_some()
        {
            base.publish(
                service.kind,
                Characteristic::StatusFault,
                CharacteristicValue::fault(false),
            )
            .await;
        }
    }

    tracing::info!(
        appliance = %base.name(),
        count = notifications.len(),
        "retrieved notifications"
    );

    let thresholds = base.thresholds().await;
    let ctx = MessageContext {
        thresholds: Some(&thresholds),
        temperature,
        battery_level,
    };
    for item in &notifications {
        let message = notification::format_message(item, &ctx);
        tracing::warn!(appliance = %base.name(), "{message}");

        match notification::effect(item.category, item.kind) {
            Effect::LeakDetected => leak = true,
            Effect::TemperatureFault => {
                base.publish(
                    ServiceKind::TemperatureSensor,
                    Characteristic::StatusFault,
                    CharacteristicValue::fault(true),
                )
                .await;
            }
            Effect::HumidityFault if has_humidity => {
                base.publish(
                    ServiceKind::HumiditySensor,
                    Characteristic::StatusFault,
                    CharacteristicValue::fault(true),
                )
                .await;
            }
            Effect::HumidityFault | Effect::None => {}
        }

        base.publish_event(Event::new(
            EventType::NotificationReceived,
            Some(base.id()),
            json!({
                "category": item.category,
                "type": item.kind,
                "timestamp": item.timestamp,
                "message": message,
            }),
        ))
        .await;
    }

    base.publish(
        ServiceKind::LeakSensor,
        Characteristic::LeakDetected,
        CharacteristicValue::leak(leak),
    )
    .await;
    base.publish(ServiceKind::LeakSensor, Characteristic::StatusActive, true.into())
        .await;
    Ok(leak)
}
