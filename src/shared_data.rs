// src/shared_data.rs

use crate::errors::RecordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, RecordError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RecordError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(RecordError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parses the `"(lat, lon)"` literal used by the position and alert stores.
    pub fn parse_literal(s: &str) -> Result<Self, RecordError> {
        let malformed = || RecordError::MalformedCoordinates(s.to_string());
        let inner = s
            .trim()
            .trim_matches('"')
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let (lat, lon) = inner.split_once(',').ok_or_else(malformed)?;
        if lon.contains(',') {
            return Err(malformed());
        }
        let lat = lat.trim().parse::<f64>().map_err(|_| malformed())?;
        let lon = lon.trim().parse::<f64>().map_err(|_| malformed())?;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(malformed());
        }
        Self::new(lat, lon)
    }

    /// Renders the `"(lat, lon)"` literal. `{:?}` keeps the decimal point on whole numbers.
    pub fn to_literal(&self) -> String {
        format!("({:?}, {:?})", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

/// Last-known position of one driver. `driver_id` is the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub driver_id: String,
    pub coordinates: Coordinates,
}

impl Position {
    pub fn new(driver_id: &str, latitude: f64, longitude: f64) -> Result<Self, RecordError> {
        let driver_id = driver_id.trim();
        if driver_id.is_empty() {
            return Err(RecordError::EmptyDriverId);
        }
        Ok(Self {
            driver_id: driver_id.to_string(),
            coordinates: Coordinates::new(latitude, longitude)?,
        })
    }
}

/// A monitored intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPost {
    pub coordinates: Coordinates,
}

impl SignalPost {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, RecordError> {
        Ok(Self {
            coordinates: Coordinates::new(latitude, longitude)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
        }
    }
}

impl FromStr for Severity {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "high" => Ok(Severity::High),
            other => Err(RecordError::UnknownSeverity(other.to_string())),
        }
    }
}

/// "Driver observed within the alert radius of a signal post."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub driver_id: String,
    pub signal_post: SignalPost,
    pub severity: Severity,
    pub created_at: u64,
}

/// One row of the persisted alert log. The log carries only the post and severity.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEntry {
    pub signal_post: SignalPost,
    pub severity: Severity,
}

impl From<&Alert> for AlertEntry {
    fn from(alert: &Alert) -> Self {
        Self {
            signal_post: alert.signal_post,
            severity: alert.severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// High and Medium declarations preempt normal cycling.
    pub fn is_active(&self) -> bool {
        matches!(self, Priority::High | Priority::Medium)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            other => Err(RecordError::UnknownPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyDeclaration {
    pub priority: Priority,
    pub driver_id: String,
}

impl EmergencyDeclaration {
    pub fn new(priority: Priority, driver_id: &str) -> Result<Self, RecordError> {
        let driver_id = driver_id.trim();
        if driver_id.is_empty() {
            return Err(RecordError::EmptyDriverId);
        }
        Ok(Self {
            priority,
            driver_id: driver_id.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalPhase {
    CyclingSignal1,
    CyclingSignal2,
    EmergencyOverride,
}

/// Owned by the signal controller; published to observers on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub phase: SignalPhase,
    pub remaining_seconds: u64,
}
