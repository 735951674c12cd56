//! HTML parsing for the portal's site selection page.

use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use crate::error::ParseError;
use crate::model::Site;
use crate::omnisense::helper::{element_text, html_selector};

static SHOW_SITE_DETAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ShowSiteDetail\('(\d+)'\)").unwrap());

/// Parses every site link from `/site_select.asp`.
///
/// Sites are anchors whose `onclick` handler calls `ShowSiteDetail('<id>')`;
/// the anchor text is the display name. Order follows the page.
pub fn parse_site_list(document: &Html) -> Result<Vec<Site>, ParseError> {
    let anchor_selector = html_selector("a[onclick]")?;

    let sites = document
        .select(&anchor_selector)
        .filter_map(|anchor| {
            let onclick = anchor.value().attr("onclick")?;
            let site_id = SHOW_SITE_DETAIL.captures(onclick)?.get(1)?.as_str();
            Some(Site::new(site_id, element_text(anchor)))
        })
        .collect();

    Ok(sites)
}
