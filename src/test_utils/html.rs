//! Portal page generators for parser and client tests.

use crate::omnisense::helper::LOGIN_FORM_MARKER;
use crate::test_utils::fixtures::sensor_cells;

/// A site selection page with one `ShowSiteDetail` link per site.
pub fn site_list_html(sites: &[(&str, &str)]) -> String {
    let links: String = sites
        .iter()
        .map(|(id, name)| {
            format!(
                r##"<tr><td><a href="#" onclick="ShowSiteDetail('{}')">{}</a></td></tr>"##,
                id, name
            )
        })
        .collect();

    format!(
        r#"<html><head><title>Site Select</title></head><body>
            <table class="siteList">{}</table>
        </body></html>"#,
        links
    )
}

/// A sensor page titled `Sensors for <site_name>` wrapping the given tables.
pub fn sensor_page_html(site_name: &str, tables: &[String]) -> String {
    format!(
        r#"<html><head><title>Sensors for {}</title></head><body>
            <h2>{}</h2>
            {}
        </body></html>"#,
        site_name,
        site_name,
        tables.join("\n")
    )
}

/// The log-in page the portal serves for bad credentials or dead sessions.
pub fn login_page_html() -> String {
    format!(
        r#"<html><head><title>OmniSense</title></head><body>
            <h3>{}</h3>
            <form method="post" action="/user_login.asp">
                <input name="userId"><input name="userPass" type="password">
                <input type="submit" name="btnAct" value="Log-In">
            </form>
        </body></html>"#,
        LOGIN_FORM_MARKER
    )
}

/// Builder for one `sortable table` of sensor rows.
#[derive(Debug, Default)]
pub struct SensorTableBuilder {
    id: Option<String>,
    caption: Option<String>,
    rows: Vec<String>,
}

impl SensorTableBuilder {
    /// A table typed through its `id` attribute, e.g. `sensorType2`.
    pub fn with_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// A table without an id, typed (or not) through its caption.
    pub fn with_caption(caption: &str) -> Self {
        Self {
            caption: Some(caption.to_string()),
            ..Self::default()
        }
    }

    /// Adds a `sensorTable` row with the given cells.
    pub fn row<S: AsRef<str>>(mut self, cells: &[S]) -> Self {
        let cells: String = cells
            .iter()
            .map(|cell| format!("<td>{}</td>", cell.as_ref()))
            .collect();
        self.rows
            .push(format!(r#"<tr class="sensorTable">{}</tr>"#, cells));
        self
    }

    /// Adds a complete row with the fixture values.
    pub fn sensor(self, sensor_id: &str) -> Self {
        self.row(&sensor_cells(sensor_id))
    }

    pub fn sensor_with_temperature(self, sensor_id: &str, temperature: &str) -> Self {
        let mut cells = sensor_cells(sensor_id);
        cells[4] = temperature.to_string();
        self.row(&cells)
    }

    pub fn sensor_with_description(self, sensor_id: &str, description: &str) -> Self {
        let mut cells = sensor_cells(sensor_id);
        cells[1] = description.to_string();
        self.row(&cells)
    }

    /// Adds the column header row, which carries no `sensorTable` class.
    pub fn header_row(mut self) -> Self {
        let headers: String = [
            "Sensor ID",
            "Description",
            "Last Activity",
            "Status",
            "Temp",
            "RH",
            "AH",
            "Dew Point",
            "Wood MC",
            "Battery",
        ]
        .iter()
        .map(|h| format!("<th>{}</th>", h))
        .collect();
        self.rows.push(format!("<tr>{}</tr>", headers));
        self
    }

    pub fn build(self) -> String {
        let id = self
            .id
            .map(|id| format!(r#" id="{}""#, id))
            .unwrap_or_default();
        let caption = self
            .caption
            .map(|caption| format!("<caption>{}</caption>", caption))
            .unwrap_or_default();

        format!(
            r#"<table class="sortable table"{}>{}{}</table>"#,
            id,
            caption,
            self.rows.join("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_list_html() {
        let html = site_list_html(&[("1234", "Home")]);
        assert!(html.contains(r#"onclick="ShowSiteDetail('1234')">Home</a>"#));
    }

    #[test]
    fn test_sensor_table_builder() {
        let html = SensorTableBuilder::with_id("sensorType2")
            .header_row()
            .sensor("2F360025")
            .build();

        assert!(html.starts_with(r#"<table class="sortable table" id="sensorType2">"#));
        assert_eq!(html.matches("<tr").count(), 2);
        assert_eq!(html.matches("<td>").count(), 10);
    }

    #[test]
    fn test_login_page_html() {
        assert!(login_page_html().contains(LOGIN_FORM_MARKER));
    }
}
