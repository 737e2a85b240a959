use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// One sample of device position and velocity as reported by the platform's location API
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub altitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: f64,
    /// Meters per second
    pub speed: f64,
    /// Course in degrees from true north
    pub bearing: f64,
    /// When the platform took this fix
    pub timestamp: UtcDT,
    /// Whether the fix came from a mock/simulated provider
    #[serde(default)]
    pub is_mock: bool,
}

impl Fix {
    /// A fix at the given coordinates with every other reading zeroed
    pub fn at(latitude: f64, longitude: f64, timestamp: UtcDT) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
            accuracy: 0.0,
            speed: 0.0,
            bearing: 0.0,
            timestamp,
            is_mock: false,
        }
    }

    pub fn to_payload(&self) -> FixPayload {
        FixPayload {
            speed: self.speed,
            altitude: self.altitude,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            bearing: self.bearing,
            time: self.timestamp.timestamp_micros() as f64 / 1000.0,
            is_mock: self.is_mock,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Wire shape of a fix on the `location` event channel
pub struct FixPayload {
    pub speed: f64,
    pub altitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub bearing: f64,
    /// Milliseconds since the unix epoch
    pub time: f64,
    pub is_mock: bool,
}

impl From<Fix> for FixPayload {
    fn from(fix: Fix) -> Self {
        fix.to_payload()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Informational strings pushed on the event channel when control methods run
pub enum ControlEcho {
    Method,
    StartLocationService,
    StopLocationService,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
/// Everything that can be pushed on the `location` event channel
pub enum LocationEvent {
    Control(ControlEcho),
    Fix(FixPayload),
}

impl From<ControlEcho> for LocationEvent {
    fn from(v: ControlEcho) -> Self {
        Self::Control(v)
    }
}

impl From<Fix> for LocationEvent {
    fn from(v: Fix) -> Self {
        Self::Fix(v.into())
    }
}
