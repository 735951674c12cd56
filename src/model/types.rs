use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder the portal shows for a sensor nobody has described yet.
pub const PORTAL_DESCRIPTION_PLACEHOLDER: &str = "~click to edit~";

/// Description stored for sensors that carry the portal placeholder.
pub const UNSET_DESCRIPTION: &str = "<description not set>";

/// A site as listed on the portal's site selection page.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Site {
    /// Numeric identifier used in `siteNbr=` query strings
    pub site_id: String,
    /// Display name; not guaranteed unique on the portal
    pub site_name: String,
}

impl Site {
    pub fn new(site_id: impl Into<String>, site_name: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            site_name: site_name.into(),
        }
    }
}

/// Hardware family of a sensor, derived from the table it is listed in.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum SensorType {
    /// Portal type number, rendered as `S-<n>`
    Known(String),
    /// Neither the table id nor its caption named a type
    Unknown,
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SensorType::Known(number) => write!(f, "S-{}", number),
            SensorType::Unknown => write!(f, "unknown"),
        }
    }
}

/// A free-text field kept as printed, plus its numeric reading if it had one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reading {
    pub raw: String,
    pub value: Option<f64>,
}

/// One sensor row as extracted from a sensor table, before derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRow {
    pub sensor_id: String,
    pub description: String,
    pub sensor_type: SensorType,
    pub last_activity_raw: String,
    pub status: String,
    pub temperature: Option<f64>,
    pub relative_humidity_raw: String,
    pub absolute_humidity_raw: String,
    pub dew_point_raw: String,
    pub wood_moisture_raw: String,
    pub battery_voltage_raw: String,
}

/// Everything parsed from one site's sensor page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SitePage {
    /// Site name from the page title, when the title carried one
    pub site_name: Option<String>,
    pub rows: Vec<SensorRow>,
    /// Rows with fewer cells than the fixed layout needs
    pub skipped_rows: usize,
}

/// Fully annotated sensor state. Identity is `sensor_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    pub sensor_id: String,
    pub site_id: String,
    pub site_name: String,
    pub description: String,
    pub sensor_type: SensorType,
    pub last_activity_raw: String,
    pub last_activity: Option<DateTime<Tz>>,
    pub status: String,
    pub temperature: Option<f64>,
    pub relative_humidity: Reading,
    pub absolute_humidity: Reading,
    pub dew_point: Reading,
    pub wood_moisture_pct: Reading,
    pub battery_voltage: Option<f64>,
    pub battery_soc: Option<f64>,
}

/// Immutable result of one successful poll cycle, keyed by sensor id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: BTreeMap<String, SensorRecord>,
    published_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn get(&self, sensor_id: &str) -> Option<&SensorRecord> {
        self.records.get(sensor_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &SensorRecord> {
        self.records.values()
    }

    pub fn sensor_ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// When the snapshot was published; `None` for the empty initial value.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// `sensor_id -> "ID - description"` labels, as offered when picking sensors.
    pub fn catalog(&self) -> BTreeMap<String, String> {
        self.records
            .values()
            .map(|r| (r.sensor_id.clone(), format!("{} - {}", r.sensor_id, r.description)))
            .collect()
    }
}

/// Accumulates records for the next snapshot. Later inserts win.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    records: BTreeMap<String, SensorRecord>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, returning the record it replaced, if any.
    pub fn insert(&mut self, record: SensorRecord) -> Option<SensorRecord> {
        self.records.insert(record.sensor_id.clone(), record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn build(self, published_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            records: self.records,
            published_at: Some(published_at),
        }
    }
}
