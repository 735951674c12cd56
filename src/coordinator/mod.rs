//! Runs poll cycles on a fixed cadence and publishes each result as an
//! immutable [`Snapshot`].
//!
//! Only the poll loop task runs cycles, one at a time, so a slow cycle
//! delays the next tick instead of overlapping it. A failed cycle leaves the
//! previous snapshot in place.

mod cycle;
mod publisher;
mod state;

use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::PollConfig;
use crate::coordinator::cycle::Poller;
use crate::coordinator::publisher::Publisher;
use crate::error::{CycleError, SetupError};
use crate::model::Snapshot;
use crate::omnisense::SensorPortal;

pub use state::CycleState;

/// Handle to a running poll loop.
pub struct Coordinator {
    publisher: Arc<Publisher>,
    refresh: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Runs the first cycle inline and, once it succeeds, starts the loop.
    ///
    /// # Errors
    /// [`SetupError::Config`] when `config` fails validation, and
    /// [`SetupError::FirstCycle`] when the first cycle fails for any reason.
    /// Nothing is spawned in either case.
    pub async fn initialize(
        portal: Arc<dyn SensorPortal>,
        config: PollConfig,
        tz: Tz,
    ) -> Result<Self, SetupError> {
        let config = config.validate()?;
        let publisher = Arc::new(Publisher::new());
        let mut poller = Poller::new(portal, config, tz, Arc::clone(&publisher));

        let snapshot = match poller.poll().await {
            Ok(snapshot) => publisher.publish(snapshot),
            Err(err) => {
                publisher.set_state(CycleState::Failed);
                tracing::error!(error = %err, "First poll cycle failed");
                return Err(SetupError::FirstCycle(err));
            }
        };
        tracing::info!(sensors = snapshot.len(), "Coordinator ready");

        let refresh = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            poller,
            Arc::clone(&publisher),
            Arc::clone(&refresh),
            shutdown_rx,
        ));

        Ok(Self {
            publisher,
            refresh,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.publisher.snapshot()
    }

    /// Registers a callback run once per published snapshot.
    pub fn on_update<F>(&self, listener: F)
    where
        F: Fn(Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.publisher.add_listener(Arc::new(listener));
    }

    /// A receiver that observes every snapshot swap.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> CycleState {
        self.publisher.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CycleState> {
        self.publisher.subscribe_state()
    }

    /// Asks for a cycle now. Requests made while a cycle runs collapse into
    /// one follow-up cycle.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stops the loop. An in-flight cycle is abandoned without publishing.
    pub async fn shutdown(mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Poll loop task failed: {:?}", e);
            }
        }
        tracing::info!("Coordinator stopped");
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state())
            .field("sensors", &self.snapshot().len())
            .finish_non_exhaustive()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_loop(
    mut poller: Poller,
    publisher: Arc<Publisher>,
    refresh: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = poller.interval();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => tracing::debug!("Poll interval elapsed"),
            _ = refresh.notified() => tracing::debug!("Refresh requested"),
        }

        let outcome = tokio::select! {
            _ = shutdown.changed() => None,
            result = poller.poll() => Some(result),
        };

        match outcome {
            Some(Ok(snapshot)) => {
                let snapshot = publisher.publish(snapshot);
                tracing::info!(sensors = snapshot.len(), "Published snapshot");
            }
            Some(Err(err)) => record_failure(&publisher, &err),
            None => {
                tracing::info!("Shutdown requested, abandoning in-flight poll cycle");
                break;
            }
        }
    }
    tracing::debug!("Poll loop stopped");
}

fn record_failure(publisher: &Publisher, err: &CycleError) {
    publisher.set_state(CycleState::Failed);
    tracing::error!(error = %err, "Poll cycle failed, keeping last snapshot");
}
