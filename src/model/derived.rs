//! Derived metrics computed from raw sensor table cells.
//!
//! Every function here is pure: same input, same output. Field-level failures
//! come back as [`FormatError`] and are turned into absent values by
//! [`annotate`], so a single bad cell never costs the whole record.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::FormatError;
use crate::model::types::{Reading, SensorRecord, SensorRow, Site};

/// Layout of the portal's "last activity" column.
pub const ACTIVITY_FORMAT: &str = "%y-%m-%d %H:%M:%S";

/// Battery discharge curve as `(volts, percent)`, ordered by falling voltage.
///
/// Values between two points are linearly interpolated. At or above the first
/// point the battery is full, at or below the last it is empty.
pub const SOC_CALIBRATION: [(f64, f64); 7] = [
    (3.40, 100.0),
    (3.30, 90.0),
    (3.20, 70.0),
    (3.10, 40.0),
    (3.00, 20.0),
    (2.90, 8.0),
    (2.80, 0.0),
];

static ACTIVITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap()
});

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(?:\d+(?:\.\d*)?|\.\d+)").unwrap());

/// Estimates remaining battery capacity in percent from a voltage reading.
///
/// Piecewise-linear over [`SOC_CALIBRATION`], clamped to `[0, 100]` and
/// rounded to two decimal places. `NaN` reads as an empty battery.
///
/// ```no_run
/// assert_eq!(estimate_state_of_charge(3.25), 80.0);
/// assert_eq!(estimate_state_of_charge(3.60), 100.0);
/// ```
pub fn estimate_state_of_charge(voltage: f64) -> f64 {
    let (full_voltage, _) = SOC_CALIBRATION[0];
    let (empty_voltage, _) = SOC_CALIBRATION[SOC_CALIBRATION.len() - 1];

    if voltage.is_nan() || voltage <= empty_voltage {
        return 0.0;
    }
    if voltage >= full_voltage {
        return 100.0;
    }

    for pair in SOC_CALIBRATION.windows(2) {
        let (high_voltage, high_percent) = pair[0];
        let (low_voltage, low_percent) = pair[1];
        if voltage >= low_voltage {
            let ratio = (voltage - low_voltage) / (high_voltage - low_voltage);
            let percent = low_percent + ratio * (high_percent - low_percent);
            return round_to_hundredths(percent.clamp(0.0, 100.0));
        }
    }

    0.0
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a `YY-MM-DD HH:MM:SS` activity string as wall-clock time in `tz`.
///
/// A time that falls into a DST fold resolves to the earlier instant; one that
/// falls into a DST gap never happened and is rejected.
pub fn parse_activity_timestamp(raw: &str, tz: &Tz) -> Result<DateTime<Tz>, FormatError> {
    let text = raw.trim();
    if !ACTIVITY_PATTERN.is_match(text) {
        return Err(FormatError::timestamp(raw));
    }

    let naive = NaiveDateTime::parse_from_str(text, ACTIVITY_FORMAT)
        .map_err(|_| FormatError::timestamp(raw))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| FormatError::timestamp(raw))
}

/// Formats a timestamp back into the portal's activity layout.
pub fn format_activity_timestamp(timestamp: &DateTime<Tz>) -> String {
    timestamp.format(ACTIVITY_FORMAT).to_string()
}

/// Parses a cell that must hold nothing but a finite number.
pub fn parse_number(raw: &str) -> Result<f64, FormatError> {
    let text = raw.trim();
    let value = text
        .parse::<f64>()
        .map_err(|e| FormatError::number(text, e))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormatError::number(text, "not a finite number"))
    }
}

/// Parses the leading number of a cell that may carry a unit suffix.
///
/// Humidity, dew point and moisture columns differ by sensor model, e.g.
/// `45.2`, `45.2%` or `-3.1 °C`.
pub fn parse_reading(raw: &str) -> Result<f64, FormatError> {
    let text = raw.trim();
    let number = LEADING_NUMBER
        .find(text)
        .ok_or_else(|| FormatError::number(text, "no leading number"))?;
    parse_number(number.as_str())
}

fn reading(raw: String) -> Reading {
    let value = parse_reading(&raw).ok();
    Reading { raw, value }
}

/// Turns an extracted row into a record with every derived field attached.
pub fn annotate(site: &Site, row: SensorRow, tz: &Tz) -> SensorRecord {
    let last_activity = match parse_activity_timestamp(&row.last_activity_raw, tz) {
        Ok(timestamp) => Some(timestamp),
        Err(err) => {
            tracing::debug!(sensor_id = %row.sensor_id, error = %err, "Last activity left absent");
            None
        }
    };

    let battery_voltage = match parse_number(&row.battery_voltage_raw) {
        Ok(voltage) => Some(voltage),
        Err(err) => {
            tracing::debug!(sensor_id = %row.sensor_id, error = %err, "Battery voltage left absent");
            None
        }
    };
    let battery_soc = battery_voltage.map(estimate_state_of_charge);

    SensorRecord {
        sensor_id: row.sensor_id,
        site_id: site.site_id.clone(),
        site_name: site.site_name.clone(),
        description: row.description,
        sensor_type: row.sensor_type,
        last_activity_raw: row.last_activity_raw,
        last_activity,
        status: row.status,
        temperature: row.temperature,
        relative_humidity: reading(row.relative_humidity_raw),
        absolute_humidity: reading(row.absolute_humidity_raw),
        dew_point: reading(row.dew_point_raw),
        wood_moisture_pct: reading(row.wood_moisture_raw),
        battery_voltage,
        battery_soc,
    }
}
