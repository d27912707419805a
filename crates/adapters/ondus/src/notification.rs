//! Notification classification.
//!
//! The Ondus API reports alerts as a `(category, type)` pair. This module
//! turns a pair into a human-readable message and into the effect it has on
//! the accessory (leak detected, temperature or humidity fault).

use std::borrow::Cow;

use crate::api::Notification;
use crate::thresholds::Thresholds;

pub const CATEGORY_FIRMWARE: i64 = 10;
pub const CATEGORY_WARNING: i64 = 20;
pub const CATEGORY_CRITICAL: i64 = 30;

/// What a notification does to the accessory state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    LeakDetected,
    TemperatureFault,
    HumidityFault,
}

/// Live values interpolated into messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageContext<'a> {
    pub thresholds: Option<&'a Thresholds>,
    pub temperature: f64,
    pub battery_level: Option<i64>,
}

/// Effect of a `(category, type)` pair.
#[must_use]
pub fn effect(category: i64, kind: i64) -> Effect {
    match (category, kind) {
        (CATEGORY_CRITICAL, _) | (CATEGORY_WARNING, 320 | 321 | 330 | 332 | 420 | 421) => {
            Effect::LeakDetected
        }
        (CATEGORY_WARNING, 20 | 21 | 40 | 340) => Effect::TemperatureFault,
        (CATEGORY_WARNING, 30 | 31) => Effect::HumidityFault,
        _ => Effect::None,
    }
}

/// Text of a `(category, type)` pair.
#[must_use]
pub fn describe(category: i64, kind: i64, ctx: &MessageContext<'_>) -> Cow<'static, str> {
    let thresholds = ctx.thresholds.copied().unwrap_or_default();
    let text = match (category, kind) {
        (CATEGORY_FIRMWARE, 10) => "Sense integration successful",
        (CATEGORY_FIRMWARE, 60) => "Sense firmware update available",
        (CATEGORY_FIRMWARE, 410) => "Guard integration successful",
        (CATEGORY_FIRMWARE, 460) => "Guard firmware update available",
        (CATEGORY_FIRMWARE, 555) => "Blue auto-flush active",
        (CATEGORY_FIRMWARE, 556) => "Blue auto-flush inactive",
        (CATEGORY_FIRMWARE, 557) => "Blue empty CO2 cartridge",
        (CATEGORY_FIRMWARE, 559) => "Blue cleaning completed",
        (CATEGORY_FIRMWARE, 560) => "Blue firmware update available",

        (CATEGORY_WARNING, 11) => {
            let level = ctx
                .battery_level
                .map_or_else(|| "unknown".to_string(), |l| l.to_string());
            return format!("Battery is at critical level: {level}%").into();
        }
        (CATEGORY_WARNING, 12) => "Battery is empty and must be changed",
        (CATEGORY_WARNING, 20) => {
            return format!(
                "Temperature levels have dropped below the minimum configured limit of {}˚C",
                thresholds.temperature.min.value
            )
            .into();
        }
        (CATEGORY_WARNING, 21) => {
            return format!(
                "Temperature levels have exceeded the maximum configured limit of {}˚C",
                thresholds.temperature.max.value
            )
            .into();
        }
        (CATEGORY_WARNING, 30) => {
            return format!(
                "Humidity levels have dropped below the minimum configured limit of {}% RF",
                thresholds.humidity.min.value
            )
            .into();
        }
        (CATEGORY_WARNING, 31) => {
            return format!(
                "Humidity levels have exceeded the maximum configured limit of {}% RF",
                thresholds.humidity.max.value
            )
            .into();
        }
        (CATEGORY_WARNING, 40 | 340) => {
            return format!(
                "Frost warning! Current temperature is {}˚C",
                ctx.temperature
            )
            .into();
        }
        (CATEGORY_WARNING, 80) => "Guard lost WiFi connection",
        (CATEGORY_WARNING, 320) => "Unusual water consumption detected - water has been SHUT OFF",
        (CATEGORY_WARNING, 321) => "Unusual water consumption detected - water still ON",
        (CATEGORY_WARNING, 330) => "Micro leakage detected",
        (CATEGORY_WARNING, 332) => "Micro leakage detected over several days",
        (CATEGORY_WARNING, 380) => "Sense lost WiFi connection",
        (CATEGORY_WARNING, 420) => {
            "Repeated pressure problems detected over the last several hours - water has been SHUT OFF"
        }
        (CATEGORY_WARNING, 421) => {
            "Repeated pressure problems detected over the last several hours - water still ON"
        }
        (CATEGORY_WARNING, 550) => "Blue filter low",
        (CATEGORY_WARNING, 551) => "Blue CO2 low",
        (CATEGORY_WARNING, 552) => "Blue filter empty",
        (CATEGORY_WARNING, 553) => "Blue CO2 empty",
        (CATEGORY_WARNING, 558) => "Blue cleaning needed",
        (CATEGORY_WARNING, 564) => "Blue filter stock is empty",
        (CATEGORY_WARNING, 565) => "Blue CO2 stock is empty",
        (CATEGORY_WARNING, 580) => "Blue lost WiFi connection",

        (CATEGORY_CRITICAL, 0) => "Flooding detected - water has been SHUT OFF",
        (CATEGORY_CRITICAL, 310) => "Pipe break - water has been SHUT OFF",
        (CATEGORY_CRITICAL, 400) => "Maximum water volume reached - water has been SHUT OFF",
        (CATEGORY_CRITICAL, 430) => "Water detected by Sense - water has been SHUT OFF",
        (CATEGORY_CRITICAL, 431) => "Water detected by Sense - water still ON",

        _ => return format!("Unknown notification category={category} type={kind}").into(),
    };
    Cow::Borrowed(text)
}

/// `{timestamp} => {text}` for a notification.
#[must_use]
pub fn format_message(notification: &Notification, ctx: &MessageContext<'_>) -> String {
    format!(
        "{} => {}",
        notification.timestamp,
        describe(notification.category, notification.kind, ctx)
    )
}
