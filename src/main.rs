//! OmniSense Sensor Poller
//!
//! Logs in to the OmniSense web portal on a fixed cadence, scrapes the sensor
//! tables of the configured sites and keeps the latest readings of every
//! sensor as one immutable snapshot.
//!
//! # Architecture
//!
//! - **omnisense**: portal client, session handling and HTML parsing
//! - **model**: sensor records, derived values and per-metric projections
//! - **coordinator**: poll loop, snapshot publication and lifecycle
//!
//! This binary stands in for the host application: it logs the sensor
//! catalog at startup and every metric of each published snapshot.
//!
//! # Signals
//!
//! - SIGTERM / SIGINT: graceful shutdown, abandoning any in-flight cycle
//! - SIGHUP: poll immediately

mod config;
mod coordinator;
mod error;
mod model;
mod omnisense;

#[cfg(test)]
mod test_utils;

use anyhow::Context;
use std::sync::Arc;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};

use crate::coordinator::Coordinator;
use crate::model::{device_info, Metric, Snapshot};
use crate::omnisense::SensorPortal;

#[tokio::main]
async fn main() {
    let app_config = match config::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{:#}", anyhow::Error::new(e));
        std::process::exit(1);
    }
}

async fn run() -> error::Result<()> {
    let omnisense_config = config::load_omnisense_config()?;
    let poll_config = config::load_poll_config()?;
    let tz = omnisense_config.timezone()?;

    tracing::info!(
        url = %omnisense_config.url,
        sites = ?poll_config.sites,
        interval_sec = poll_config.interval_sec,
        "Starting OmniSense poller"
    );

    let portal: Arc<dyn SensorPortal> = Arc::new(omnisense::Client::new(omnisense_config));
    let coordinator = Coordinator::initialize(portal, poll_config, tz).await?;

    log_catalog(&coordinator.snapshot());
    log_metrics(&coordinator.snapshot());
    coordinator.on_update(|snapshot| log_metrics(&snapshot));

    let mut sig_term =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sig_hup = signal(SignalKind::hangup()).context("Failed to register SIGHUP handler")?;

    tracing::info!("Running... Press Ctrl-C or send SIGTERM to terminate.");
    loop {
        tokio::select! {
            _ = sig_term.recv() => {
                tracing::info!("Received SIGTERM. Exiting...");
                break;
            }
            _ = ctrl_c() => {
                tracing::info!("Received SIGINT. Exiting...");
                break;
            }
            _ = sig_hup.recv() => {
                tracing::info!("Received SIGHUP. Polling now...");
                coordinator.request_refresh();
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

/// Logs the `sensor_id -> label` catalog a user would pick sensors from.
fn log_catalog(snapshot: &Snapshot) {
    tracing::info!("Discovered {} sensors", snapshot.len());
    for (sensor_id, label) in snapshot.catalog() {
        tracing::info!(sensor_id = %sensor_id, "{}", label);
    }
}

/// Logs every metric with a value; absent metrics are skipped.
fn log_metrics(snapshot: &Snapshot) {
    for record in snapshot.records() {
        let device = device_info(record);
        for metric in Metric::ALL {
            let Some(value) = metric.value(record) else {
                continue;
            };
            tracing::debug!(
                unique_id = %metric.unique_id(record),
                device = %device.name,
                unit = metric.unit().unwrap_or(""),
                "{}: {}",
                metric.label(),
                value
            );
        }
    }
}
