use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::accuracy::AccuracyTier;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Settings a [crate::LocationService] starts with, the host can change the interval later
/// through `set_configuration`
pub struct ServiceSettings {
    /// Minimum spacing between emitted fixes, also the heartbeat period
    pub interval_millis: u64,
    /// Tier used when `start_location_service` doesn't carry a valid priority
    pub default_accuracy: AccuracyTier,
    /// Distance filter used when `start_location_service` doesn't carry one
    pub default_distance_filter: f64,
}

impl ServiceSettings {
    /// The configured interval, or the default one if `interval_millis` is zero
    pub fn interval(&self) -> Duration {
        interval_from_millis(self.interval_millis as f64).unwrap_or(DEFAULT_INTERVAL)
    }
}

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            interval_millis: DEFAULT_INTERVAL.as_millis() as u64,
            default_accuracy: AccuracyTier::Best,
            default_distance_filter: 0.0,
        }
    }
}

/// Interpret a number of milliseconds as an interval. Only finite, positive values make a
/// usable interval.
pub fn interval_from_millis(millis: f64) -> Option<Duration> {
    if !millis.is_finite() || millis <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(millis / 1000.0)
        .ok()
        .filter(|d| !d.is_zero())
}

/// Parse the millisecond string sent by `set_configuration`
pub fn parse_interval(raw: &str) -> Option<Duration> {
    raw.parse::<f64>().ok().and_then(interval_from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millis() {
        assert_eq!(parse_interval("30000"), Some(Duration::from_secs(30)));
        assert_eq!(parse_interval("1500"), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["not-a-number", "", "0", "-1000", "NaN", "inf", " 1000"] {
            assert_eq!(parse_interval(raw), None, "{raw:?} should be rejected");
        }
    }

    #[test]
    fn settings_defaults() {
        let settings: ServiceSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ServiceSettings::default());
        assert_eq!(settings.interval(), Duration::from_secs(60));
    }

    #[test]
    fn zero_interval_setting_uses_default() {
        let settings = ServiceSettings {
            interval_millis: 0,
            ..Default::default()
        };
        assert_eq!(settings.interval(), DEFAULT_INTERVAL);
    }
}
