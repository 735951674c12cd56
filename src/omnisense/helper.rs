//! Helper functions for reading OmniSense portal HTML.

use scraper::{ElementRef, Selector};

use crate::error::ParseError;

/// Text the portal renders on its log-in form. Seeing it anywhere but the
/// login page means the session was not (or is no longer) accepted.
pub const LOGIN_FORM_MARKER: &str = "User Log-In";

/// Creates a CSS selector from a string.
///
/// This is a wrapper around scraper's Selector::parse that converts
/// parsing errors into [`ParseError`] for consistent error handling.
///
/// # Examples
///
/// Valid selectors:
/// - `"table.sortable.table"` - Table carrying both classes
/// - `"tr.sensorTable"` - Sensor rows
/// - `"a[onclick]"` - Anchors with an inline handler
pub fn html_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::invalid_selector(selector, e))
}

/// Collects the text of an element, trimming every text node and joining
/// them without separators.
///
/// ```no_run
/// // <td> 2F36 <b>0025</b> </td>  ->  "2F360025"
/// let id = element_text(cell);
/// ```
pub fn element_text(element: ElementRef) -> String {
    element.text().map(str::trim).collect::<String>()
}

/// True when a response body is the portal's log-in form.
pub fn contains_login_form(body: &str) -> bool {
    body.contains(LOGIN_FORM_MARKER)
}
