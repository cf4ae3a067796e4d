//! Runtime configuration.
//!
//! Loaded from an optional JSON file. Every field falls back to the
//! constants in [`crate::global_variables`], so running without a config
//! file uses the stock store names in the working directory.

use crate::errors::ConfigError;
use crate::global_variables::{
    ALERTS_FILE, ALERT_RADIUS_KM, EMERGENCY_FILE, EMERGENCY_OVERRIDE_SECS, MIN_GREEN_SECS,
    POLL_INTERVAL_MS, POSITIONS_FILE, SAMPLING_WINDOW_SECS, SECONDS_PER_VEHICLE,
    SIGNAL_POSTS_FILE, TICK_SECS,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub positions_path: PathBuf,
    pub signal_posts_path: PathBuf,
    pub emergency_path: PathBuf,
    pub alerts_path: PathBuf,
    pub alert_radius_km: f64,
    pub seconds_per_vehicle: f64,
    pub min_green_secs: f64,
    pub override_secs: u64,
    pub sampling_window_secs: u64,
    pub tick_secs: u64,
    pub poll_interval_ms: u64,
    /// Recorded per-frame detections for lane 1 and lane 2.
    pub lane_feeds: [Option<PathBuf>; 2],
    pub show_countdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            positions_path: PathBuf::from(POSITIONS_FILE),
            signal_posts_path: PathBuf::from(SIGNAL_POSTS_FILE),
            emergency_path: PathBuf::from(EMERGENCY_FILE),
            alerts_path: PathBuf::from(ALERTS_FILE),
            alert_radius_km: ALERT_RADIUS_KM,
            seconds_per_vehicle: SECONDS_PER_VEHICLE,
            min_green_secs: MIN_GREEN_SECS,
            override_secs: EMERGENCY_OVERRIDE_SECS,
            sampling_window_secs: SAMPLING_WINDOW_SECS,
            tick_secs: TICK_SECS,
            poll_interval_ms: POLL_INTERVAL_MS,
            lane_feeds: [None, None],
            show_countdown: true,
        }
    }
}

impl Config {
    /// Reads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                serde_json::from_str::<Config>(&raw).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alert_radius_km > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "alert_radius_km must be positive, got {}",
                self.alert_radius_km
            )));
        }
        if !(self.seconds_per_vehicle > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "seconds_per_vehicle must be positive, got {}",
                self.seconds_per_vehicle
            )));
        }
        if !(self.min_green_secs >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_green_secs must not be negative, got {}",
                self.min_green_secs
            )));
        }
        if self.tick_secs == 0 {
            return Err(ConfigError::Invalid("tick_secs must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn sampling_window(&self) -> Duration {
        Duration::from_secs(self.sampling_window_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
