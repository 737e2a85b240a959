mod accuracy;
mod channel;
mod fix;
mod provider;
mod service;
mod settings;
#[cfg(test)]
mod tests;
mod throttle;

pub use accuracy::AccuracyTier;
pub use channel::{
    IS_SERVICE_RUNNING, MethodCall, MethodChannel, MethodResponse, SET_ANDROID_NOTIFICATION,
    SET_CONFIGURATION, START_LOCATION_SERVICE, STOP_LOCATION_SERVICE,
};
pub use fix::{ControlEcho, Fix, FixPayload, LocationEvent, UtcDT};
pub use provider::{FixSender, LocationListener, LocationProvider, UpdateRequest};
pub use service::LocationService;
pub use settings::{DEFAULT_INTERVAL, ServiceSettings, interval_from_millis, parse_interval};
pub use throttle::ThrottleState;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
