//! HTML parsing for the portal's per-site sensor page.
//!
//! A sensor page carries one table per sensor type. Tables are found by their
//! `sortable table` classes and rows by the `sensorTable` class, never by
//! position, because the portal reorders and adds tables freely. Each row has
//! at least ten cells in a fixed order:
//!
//! | cell | content                   |
//! |------|---------------------------|
//! | 0    | sensor id                 |
//! | 1    | description               |
//! | 2    | last activity (`YY-MM-DD HH:MM:SS`) |
//! | 3    | status                    |
//! | 4    | temperature               |
//! | 5    | relative humidity         |
//! | 6    | absolute humidity         |
//! | 7    | dew point                 |
//! | 8    | wood moisture             |
//! | 9    | battery voltage           |

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::ParseError;
use crate::model::types::{PORTAL_DESCRIPTION_PLACEHOLDER, UNSET_DESCRIPTION};
use crate::model::{SensorRow, SensorType, SitePage};
use crate::omnisense::helper::{element_text, html_selector};

/// Minimum number of cells a row needs to become a record.
pub const MIN_CELLS: usize = 10;

const TABLE_SELECTOR: &str = "table.sortable.table";
const ROW_SELECTOR: &str = "tr.sensorTable";
const TABLE_ID_PREFIX: &str = "sensorType";

static CAPTION_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sensor Type\s*(\d+)").unwrap());

static TITLE_SITE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sensors for\s+(.+)").unwrap());

/// Parses all sensor rows from `/sensor_select.asp?siteNbr=<id>`.
///
/// Rows with fewer than [`MIN_CELLS`] cells are counted in
/// [`SitePage::skipped_rows`] and otherwise ignored. With a non-empty
/// `sensor_filter`, rows for other sensor ids are dropped silently.
///
/// # Errors
/// [`ParseError::ElementNotFound`] when the page has neither a `Sensors for`
/// title nor a single sensor table, i.e. it is not a sensor page at all.
/// [`ParseError::UnexpectedStructure`] when sensor rows exist but none of
/// them has enough cells, which means the table layout changed.
pub fn parse_sensor_page(
    document: &Html,
    sensor_filter: &HashSet<String>,
) -> Result<SitePage, ParseError> {
    let table_selector = html_selector(TABLE_SELECTOR)?;
    let row_selector = html_selector(ROW_SELECTOR)?;
    let cell_selector = html_selector("td")?;
    let caption_selector = html_selector("caption")?;

    let site_name = parse_site_name(document)?;
    let tables: Vec<ElementRef> = document.select(&table_selector).collect();
    if tables.is_empty() && site_name.is_none() {
        return Err(ParseError::element_not_found(TABLE_SELECTOR));
    }

    let mut page = SitePage {
        site_name,
        ..SitePage::default()
    };

    let mut parsed = 0;
    for table in tables {
        let sensor_type = table_sensor_type(table, &caption_selector);

        for row in table.select(&row_selector) {
            let cells: Vec<String> = row.select(&cell_selector).map(element_text).collect();

            let Some(sensor_row) = parse_row(&cells, &sensor_type) else {
                tracing::debug!(cells = cells.len(), "Skipping sensor row with too few cells");
                page.skipped_rows += 1;
                continue;
            };
            parsed += 1;

            if !sensor_filter.is_empty() && !sensor_filter.contains(&sensor_row.sensor_id) {
                continue;
            }
            page.rows.push(sensor_row);
        }
    }

    if parsed == 0 && page.skipped_rows > 0 {
        return Err(ParseError::unexpected(format!(
            "all {} sensor rows have fewer than {} cells",
            page.skipped_rows, MIN_CELLS
        )));
    }
    Ok(page)
}

/// Site name from a `<title>Sensors for NAME</title>`, if present.
fn parse_site_name(document: &Html) -> Result<Option<String>, ParseError> {
    let title_selector = html_selector("title")?;
    let name = document
        .select(&title_selector)
        .next()
        .map(|title| title.text().collect::<String>())
        .and_then(|text| {
            TITLE_SITE_NAME
                .captures(text.trim())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .filter(|name| !name.is_empty());
    Ok(name)
}

/// Sensor type from the table's `id="sensorType<n>"`, else from a
/// `Sensor Type <n>` caption, else [`SensorType::Unknown`].
fn table_sensor_type(table: ElementRef, caption_selector: &Selector) -> SensorType {
    if let Some(number) = table
        .value()
        .id()
        .and_then(|id| id.strip_prefix(TABLE_ID_PREFIX))
        .filter(|number| !number.is_empty())
    {
        return SensorType::Known(number.to_string());
    }

    table
        .select(caption_selector)
        .next()
        .map(|caption| caption.text().collect::<String>())
        .and_then(|text| {
            CAPTION_TYPE
                .captures(&text)
                .and_then(|c| c.get(1))
                .map(|m| SensorType::Known(m.as_str().to_string()))
        })
        .unwrap_or(SensorType::Unknown)
}

fn parse_row(cells: &[String], sensor_type: &SensorType) -> Option<SensorRow> {
    if cells.len() < MIN_CELLS {
        return None;
    }

    let description = if cells[1] == PORTAL_DESCRIPTION_PLACEHOLDER {
        UNSET_DESCRIPTION.to_string()
    } else {
        cells[1].clone()
    };

    let temperature = match crate::model::derived::parse_number(&cells[4]) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(sensor_id = %cells[0], error = %err, "Temperature left absent");
            None
        }
    };

    Some(SensorRow {
        sensor_id: cells[0].clone(),
        description,
        sensor_type: sensor_type.clone(),
        last_activity_raw: cells[2].clone(),
        status: cells[3].clone(),
        temperature,
        relative_humidity_raw: cells[5].clone(),
        absolute_humidity_raw: cells[6].clone(),
        dew_point_raw: cells[7].clone(),
        wood_moisture_raw: cells[8].clone(),
        battery_voltage_raw: cells[9].clone(),
    })
}
