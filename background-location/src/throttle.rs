use std::time::Duration;

use chrono::TimeDelta;
use log::debug;

use crate::fix::{Fix, UtcDT};

/// Decides which fixes reach the consumer. Holds no timers itself, the owning service feeds it
/// fixes and heartbeat ticks.
#[derive(Debug, Clone)]
pub struct ThrottleState {
    last_emitted_at: Option<UtcDT>,
    last_known_fix: Option<Fix>,
    interval: Duration,
    running: bool,
}

impl ThrottleState {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_emitted_at: None,
            last_known_fix: None,
            interval,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_emitted_at(&self) -> Option<UtcDT> {
        self.last_emitted_at
    }

    pub fn last_known_fix(&self) -> Option<&Fix> {
        self.last_known_fix.as_ref()
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_emitted_at = None;
    }

    /// Stop emitting. The last known fix is kept, the emit time is cleared so the first fix of
    /// the next session always goes through.
    pub fn stop(&mut self) {
        self.running = false;
        self.last_emitted_at = None;
    }

    /// Set a new interval, ignored unless it's non-zero
    pub fn set_interval(&mut self, interval: Duration) -> bool {
        if interval.is_zero() {
            return false;
        }
        self.interval = interval;
        true
    }

    fn interval_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.interval).unwrap_or(TimeDelta::MAX)
    }

    /// Record a raw fix from the provider, returning it if it should be emitted
    pub fn on_fix(&mut self, fix: Fix) -> Option<Fix> {
        self.last_known_fix = Some(fix);

        if !self.running {
            debug!("Fix received while stopped, storing only");
            return None;
        }

        if let Some(last) = self.last_emitted_at {
            let elapsed = fix.timestamp.signed_duration_since(last);
            debug!(
                "Time since last update: {}ms",
                elapsed.num_milliseconds()
            );
            if elapsed < self.interval_delta() {
                debug!("Skipping update, too soon");
                return None;
            }
        } else {
            debug!("First update since start");
        }

        self.last_emitted_at = Some(fix.timestamp);
        Some(fix)
    }

    /// A heartbeat tick, returns the last known fix to re-send if there is one.
    /// Does not touch the last emit time.
    pub fn heartbeat(&self) -> Option<Fix> {
        if !self.running {
            return None;
        }
        if self.last_known_fix.is_none() {
            debug!("Heartbeat fired but no location available");
        }
        self.last_known_fix
    }
}
