//! Domain model for OmniSense sensor data.
//!
//! Typed records replace the portal's loosely structured rows, and derived
//! values (state of charge, localized timestamps) are computed by the pure
//! functions in [`derived`].

pub mod derived;
pub mod projection;
pub mod types;

pub use derived::annotate;
pub use projection::{device_info, Metric};
pub use types::{SensorRecord, SensorRow, SensorType, Site, SitePage, Snapshot, SnapshotBuilder};
