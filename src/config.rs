use crate::error::ConfigError;
use chrono_tz::Tz;
use serde_derive::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.as_str()).unwrap_or(tracing::Level::INFO)
    }
}

pub(crate) fn load_app_config() -> Result<AppConfig, ConfigError> {
    match envy::from_env::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(ConfigError::env_parse(format!(
            "Failed to load AppConfig: {}",
            err
        ))),
    }
}

/// Upper bound for every second-valued setting. Larger values overflow
/// timer deadlines.
pub const MAX_DURATION_SEC: u64 = 24 * 60 * 60;

fn check_duration_sec(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "must be at least 1 second"));
    }
    if value > MAX_DURATION_SEC {
        return Err(ConfigError::invalid(
            field,
            format!("must be at most {} seconds", MAX_DURATION_SEC),
        ));
    }
    Ok(())
}

fn default_url() -> String {
    "https://www.omnisense.com".to_string()
}

fn default_request_timeout_sec() -> u64 {
    10
}

fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct OmnisenseConfig {
    #[serde(default = "default_url")]
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
    // the portal prints local wall-clock time without an offset
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl OmnisenseConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        check_duration_sec("OMNISENSE_REQUEST_TIMEOUT_SEC", self.request_timeout_sec)?;
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::invalid("OMNISENSE_TIMEZONE", e.to_string()))
    }
}

pub(crate) fn load_omnisense_config() -> Result<OmnisenseConfig, ConfigError> {
    match envy::prefixed("OMNISENSE_").from_env::<OmnisenseConfig>() {
        Ok(config) => config.validate(),
        Err(err) => Err(ConfigError::env_parse(format!(
            "Failed to load OmnisenseConfig: {}",
            err
        ))),
    }
}

fn default_interval_sec() -> u64 {
    60
}

fn default_cycle_timeout_sec() -> u64 {
    30
}

fn default_max_concurrent_sites() -> usize {
    1
}

#[derive(Deserialize, Debug, Clone)]
pub struct PollConfig {
    // site names or numeric site ids, in polling order
    pub sites: Vec<String>,
    #[serde(default)]
    pub sensor_ids: Vec<String>,
    #[serde(default = "default_interval_sec")]
    pub interval_sec: u64,
    #[serde(default = "default_cycle_timeout_sec")]
    pub cycle_timeout_sec: u64,
    #[serde(default = "default_max_concurrent_sites")]
    pub max_concurrent_sites: usize,
}

impl PollConfig {
    /// Trims blank entries and checks the bounds the coordinator relies on.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.sites = normalize_list(self.sites);
        self.sensor_ids = normalize_list(self.sensor_ids);

        if self.sites.is_empty() {
            return Err(ConfigError::missing("POLL_SITES"));
        }
        check_duration_sec("POLL_INTERVAL_SEC", self.interval_sec)?;
        check_duration_sec("POLL_CYCLE_TIMEOUT_SEC", self.cycle_timeout_sec)?;
        if self.max_concurrent_sites == 0 {
            self.max_concurrent_sites = 1;
        }
        Ok(self)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_sec)
    }

    /// Sensor-id allow-list; empty means every sensor is kept.
    pub fn sensor_filter(&self) -> HashSet<String> {
        self.sensor_ids.iter().cloned().collect()
    }
}

fn normalize_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub fn load_poll_config() -> Result<PollConfig, ConfigError> {
    match envy::prefixed("POLL_").from_env::<PollConfig>() {
        Ok(config) => config.validate(),
        Err(err) => Err(ConfigError::env_parse(format!(
            "Failed to load PollConfig: {}",
            err
        ))),
    }
}
