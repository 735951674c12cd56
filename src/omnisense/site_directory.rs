//! Maps configured site names (or ids) to the portal's site identifiers.

use std::collections::{HashMap, HashSet};

use crate::error::OmnisenseError;
use crate::model::Site;
use crate::omnisense::portal::PortalSession;

/// Resolves configured site names or ids against the portal's site listing.
///
/// Returns the matched sites in the order they were requested. Entries that
/// match nothing are dropped with a warning: sites get renamed on the portal
/// and a subset is a normal answer.
pub async fn resolve(
    session: &dyn PortalSession,
    requested: &[String],
) -> Result<Vec<Site>, OmnisenseError> {
    let listing = session.list_sites().await?;
    tracing::debug!(sites = listing.len(), "Fetched site directory");
    Ok(match_sites(&listing, requested))
}

/// Matches requested entries against a site listing.
///
/// An entry matches a site id exactly, or a site name case-insensitively.
/// When several sites share a name the first one listed wins. Each site is
/// returned at most once.
pub fn match_sites(listing: &[Site], requested: &[String]) -> Vec<Site> {
    let by_id: HashMap<&str, &Site> = listing
        .iter()
        .map(|site| (site.site_id.as_str(), site))
        .collect();

    let mut by_name: HashMap<String, &Site> = HashMap::new();
    for site in listing {
        by_name
            .entry(site.site_name.trim().to_lowercase())
            .or_insert(site);
    }

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for entry in requested {
        let key = entry.trim();
        let site = by_id
            .get(key)
            .or_else(|| by_name.get(&key.to_lowercase()))
            .copied();

        match site {
            Some(site) => {
                if seen.insert(site.site_id.clone()) {
                    resolved.push(site.clone());
                }
            }
            None => tracing::warn!(site = %key, "Configured site not found on portal"),
        }
    }

    resolved
}
