use tokio::sync::mpsc;

use crate::{
    accuracy::AccuracyTier,
    fix::{ControlEcho, Fix},
    prelude::*,
};

#[derive(Debug, Clone, Copy, PartialEq)]
/// What the native provider is asked for when updates start
pub struct UpdateRequest {
    pub accuracy: AccuracyTier,
    /// Minimum movement in meters before the provider reports a new fix, 0 reports everything
    pub distance_filter: f64,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            accuracy: AccuracyTier::Best,
            distance_filter: 0.0,
        }
    }
}

/// Handle a [LocationProvider] uses to deliver raw fixes into a running session
#[derive(Debug, Clone)]
pub struct FixSender(mpsc::UnboundedSender<Fix>);

impl FixSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Fix>) -> Self {
        Self(tx)
    }

    /// Deliver a fix, returns `false` once the session it belongs to has ended
    pub fn send(&self, fix: Fix) -> bool {
        self.0.send(fix).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// The platform's location API
pub trait LocationProvider: Send + Sync {
    /// Whether this platform can honor the given accuracy tier
    fn supports(&self, _tier: AccuracyTier) -> bool {
        true
    }
    /// Begin delivering fixes to `fixes`. An `Err` here (missing authorization for example) is
    /// logged by the service and otherwise ignored, no fixes will arrive.
    fn start_updates(&self, request: UpdateRequest, fixes: FixSender) -> Result;
    /// Stop delivering fixes, called on stop and before a session is replaced
    fn stop_updates(&self);
}

/// The consumer on the other side of the platform boundary
pub trait LocationListener: Send + Sync {
    /// A fix passed throttling (or is a heartbeat re-send)
    fn on_fix(&self, fix: Fix);
    /// A control method ran, informational only
    fn on_control(&self, _echo: ControlEcho) {}
}
