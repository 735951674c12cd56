//! One poll cycle: log in, resolve sites, fetch each site, assemble a snapshot.

use chrono::Utc;
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PollConfig;
use crate::coordinator::publisher::Publisher;
use crate::coordinator::state::CycleState;
use crate::error::{CycleError, OmnisenseError};
use crate::model::{SensorRecord, Site, Snapshot, SnapshotBuilder};
use crate::omnisense::{fetch_sensors, resolve, PortalSession, SensorPortal};

type SiteOutcome = (Site, Result<Vec<SensorRecord>, OmnisenseError>);

/// Owns everything a cycle needs. Only the poll loop holds one, so cycles
/// cannot overlap.
pub(crate) struct Poller {
    portal: Arc<dyn SensorPortal>,
    config: PollConfig,
    sensor_filter: HashSet<String>,
    tz: Tz,
    sites: Option<Vec<Site>>,
    publisher: Arc<Publisher>,
}

impl Poller {
    pub(crate) fn new(
        portal: Arc<dyn SensorPortal>,
        config: PollConfig,
        tz: Tz,
        publisher: Arc<Publisher>,
    ) -> Self {
        let sensor_filter = config.sensor_filter();
        Self {
            portal,
            config,
            sensor_filter,
            tz,
            sites: None,
            publisher,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.config.interval()
    }

    /// Runs one cycle under the cycle deadline.
    ///
    /// Dropping the returned future, or hitting the deadline, drops the
    /// session mid-flight; sessions release their transport on drop.
    pub(crate) async fn poll(&mut self) -> Result<Snapshot, CycleError> {
        let deadline = self.config.cycle_timeout();
        let deadline_sec = self.config.cycle_timeout_sec;

        match tokio::time::timeout(deadline, self.run_cycle()).await {
            Ok(result) => result,
            Err(_) => Err(CycleError::TimedOut(deadline_sec)),
        }
    }

    async fn run_cycle(&mut self) -> Result<Snapshot, CycleError> {
        self.publisher.set_state(CycleState::Authenticating);
        let mut session = self.portal.login().await?;

        let result = self.collect(session.as_ref()).await;
        session.close();
        result
    }

    async fn collect(&mut self, session: &dyn PortalSession) -> Result<Snapshot, CycleError> {
        self.publisher.set_state(CycleState::Fetching);
        let sites = self.resolved_sites(session).await?;

        let sensor_filter = &self.sensor_filter;
        let tz = &self.tz;
        let outcomes: Vec<SiteOutcome> = stream::iter(sites)
            .map(|site| async move {
                let result = fetch_sensors(session, &site, sensor_filter, tz).await;
                (site, result)
            })
            .buffered(self.config.max_concurrent_sites)
            .collect()
            .await;

        assemble(outcomes)
    }

    /// Site resolution runs once; later cycles reuse the result.
    async fn resolved_sites(&mut self, session: &dyn PortalSession) -> Result<Vec<Site>, CycleError> {
        if let Some(sites) = &self.sites {
            return Ok(sites.clone());
        }

        let sites = resolve(session, &self.config.sites).await?;
        if sites.is_empty() {
            return Err(CycleError::NoSitesResolved);
        }

        let names: Vec<&str> = sites.iter().map(|site| site.site_name.as_str()).collect();
        tracing::info!(sites = ?names, "Resolved configured sites");
        self.sites = Some(sites.clone());
        Ok(sites)
    }
}

/// Folds per-site outcomes, in configured site order, into a snapshot.
///
/// A site that failed on transport or parsing is left out. Authentication
/// failures abort the cycle, as does every site failing.
fn assemble(outcomes: Vec<SiteOutcome>) -> Result<Snapshot, CycleError> {
    let attempted = outcomes.len();
    let mut failed = 0;
    let mut builder = SnapshotBuilder::new();

    for (site, result) in outcomes {
        match result {
            Ok(records) => {
                for record in records {
                    if let Some(previous) = builder.insert(record) {
                        tracing::warn!(
                            sensor_id = %previous.sensor_id,
                            replaced_site = %previous.site_id,
                            site_id = %site.site_id,
                            "Sensor id listed more than once, keeping the later entry"
                        );
                    }
                }
            }
            Err(err) if err.is_authentication() => return Err(CycleError::Session(err)),
            Err(err) => {
                failed += 1;
                let kind = if err.is_transport() { "transport" } else { "parse" };
                tracing::warn!(
                    site_id = %site.site_id,
                    kind,
                    error = %err,
                    "Site fetch failed, its sensors are absent from this snapshot"
                );
            }
        }
    }

    if attempted > 0 && failed == attempted {
        return Err(CycleError::AllSitesFailed(failed));
    }
    Ok(builder.build(Utc::now()))
}
