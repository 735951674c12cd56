use chrono_tz::Tz;
use std::collections::HashSet;

use crate::error::OmnisenseError;
use crate::model::{annotate, SensorRecord, Site};
use crate::omnisense::portal::PortalSession;

/// Fetches one site's sensor page and returns fully annotated records.
///
/// The page title's site name, when present, replaces the directory name.
/// Sensor ids are not de-duplicated here.
pub async fn fetch_sensors(
    session: &dyn PortalSession,
    site: &Site,
    sensor_filter: &HashSet<String>,
    tz: &Tz,
) -> Result<Vec<SensorRecord>, OmnisenseError> {
    let page = session
        .fetch_sensor_page(&site.site_id, sensor_filter)
        .await?;

    if page.skipped_rows > 0 {
        tracing::warn!(
            site_id = %site.site_id,
            skipped = page.skipped_rows,
            "Skipped sensor rows with too few cells"
        );
    }

    let site = match page.site_name {
        Some(name) => Site::new(site.site_id.clone(), name),
        None => site.clone(),
    };

    let records: Vec<SensorRecord> = page
        .rows
        .into_iter()
        .map(|row| annotate(&site, row, tz))
        .collect();

    tracing::debug!(site_id = %site.site_id, sensors = records.len(), "Fetched sensors");
    Ok(records)
}
