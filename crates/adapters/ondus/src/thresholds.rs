//! Min/max limits configured on an appliance.

use crate::api::ApplianceInfo;

/// A single configured limit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Limit {
    pub value: f64,
    pub enabled: bool,
}

/// Lower and upper limit of one quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min: Limit,
    pub max: Limit,
}

/// All limits an appliance can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    pub temperature: Bounds,
    pub humidity: Bounds,
    pub flowrate: Bounds,
    pub pressure: Bounds,
}

#[derive(Clone, Copy)]
enum Quantity {
    Temperature,
    Humidity,
    Flowrate,
    Pressure,
}

impl Quantity {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "temperature" | "temperature_guard" => Some(Self::Temperature),
            "humidity" => Some(Self::Humidity),
            "flowrate" => Some(Self::Flowrate),
            "pressure" => Some(Self::Pressure),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Flowrate => "Flowrate",
            Self::Pressure => "Pressure",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "˚C",
            Self::Humidity => "% RF",
            Self::Flowrate => "",
            Self::Pressure => " bar",
        }
    }
}

impl Thresholds {
    /// Parse `config.thresholds` from appliance info.
    ///
    /// Entries with an unknown quantity or type are ignored; a missing
    /// `config` yields all-default limits.
    #[must_use]
    pub fn parse(info: &ApplianceInfo) -> Self {
        let mut thresholds = Self::default();
        let Some(config) = info.config.as_ref() else {
            return thresholds;
        };

        for entry in &config.thresholds {
            let Some(quantity) = Quantity::parse(&entry.quantity) else {
                continue;
            };
            let bounds = thresholds.bounds_mut(quantity);
            let (slot, side) = match entry.kind.as_str() {
                "min" => (&mut bounds.min, "low"),
                "max" => (&mut bounds.max, "high"),
                _ => continue,
            };
            *slot = Limit {
                value: entry.value,
                enabled: entry.enabled,
            };
            tracing::info!(
                appliance = %info.name,
                "[{}] {} {side}: {}{}",
                if entry.enabled { '*' } else { ' ' },
                quantity.label(),
                entry.value,
                quantity.unit(),
            );
        }
        thresholds
    }

    fn bounds_mut(&mut self, quantity: Quantity) -> &mut Bounds {
        match quantity {
            Quantity::Temperature => &mut self.temperature,
            Quantity::Humidity => &mut self.humidity,
            Quantity::Flowrate => &mut self.flowrate,
            Quantity::Pressure => &mut self.pressure,
        }
    }
}
