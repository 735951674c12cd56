use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt;

use crate::model::types::SensorRecord;

pub const MANUFACTURER: &str = "OmniSense";

/// One consumer-facing value derived from a [`SensorRecord`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Metric {
    Temperature,
    BatteryLevel,
    LastActivity,
    RelativeHumidity,
    AbsoluteHumidity,
    WoodMoisture,
    DewPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Timestamp(DateTime<Tz>),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetricValue::Number(value) => write!(f, "{}", value),
            MetricValue::Timestamp(timestamp) => write!(f, "{}", timestamp.to_rfc3339()),
        }
    }
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Temperature,
        Metric::BatteryLevel,
        Metric::LastActivity,
        Metric::RelativeHumidity,
        Metric::AbsoluteHumidity,
        Metric::WoodMoisture,
        Metric::DewPoint,
    ];

    fn key(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::BatteryLevel => "battery",
            Metric::LastActivity => "last_activity",
            Metric::RelativeHumidity => "relative_humidity",
            Metric::AbsoluteHumidity => "absolute_humidity",
            Metric::WoodMoisture => "wood_moisture",
            Metric::DewPoint => "dew_point",
        }
    }

    /// Stable per-sensor id, e.g. `2F360025_battery`.
    pub fn unique_id(&self, record: &SensorRecord) -> String {
        format!("{}_{}", record.sensor_id, self.key())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::BatteryLevel => "Battery Level",
            Metric::LastActivity => "Last Activity",
            Metric::RelativeHumidity => "Relative Humidity",
            Metric::AbsoluteHumidity => "Absolute Humidity",
            Metric::WoodMoisture => "Wood Moisture",
            Metric::DewPoint => "Dew Point",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Metric::Temperature | Metric::DewPoint => Some("°C"),
            Metric::BatteryLevel | Metric::RelativeHumidity | Metric::WoodMoisture => Some("%"),
            Metric::AbsoluteHumidity => Some("g/m³"),
            Metric::LastActivity => None,
        }
    }

    pub fn value(&self, record: &SensorRecord) -> Option<MetricValue> {
        match self {
            Metric::Temperature => record.temperature.map(MetricValue::Number),
            Metric::BatteryLevel => record.battery_soc.map(MetricValue::Number),
            Metric::LastActivity => record.last_activity.map(MetricValue::Timestamp),
            Metric::RelativeHumidity => record.relative_humidity.value.map(MetricValue::Number),
            Metric::AbsoluteHumidity => record.absolute_humidity.value.map(MetricValue::Number),
            Metric::WoodMoisture => record.wood_moisture_pct.value.map(MetricValue::Number),
            Metric::DewPoint => record.dew_point.value.map(MetricValue::Number),
        }
    }
}

/// Device registry entry for one physical sensor.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: String,
}

pub fn device_info(record: &SensorRecord) -> DeviceInfo {
    DeviceInfo {
        identifier: record.sensor_id.clone(),
        name: record.description.clone(),
        manufacturer: MANUFACTURER,
        model: record.sensor_type.to_string(),
    }
}
