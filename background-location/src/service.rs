use std::{sync::Arc, time::Duration};

use log::{debug, error, info};
use tokio::{
    sync::{Mutex, mpsc},
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;

use crate::{
    fix::Fix,
    provider::{FixSender, LocationListener, LocationProvider, UpdateRequest},
    settings::{ServiceSettings, parse_interval},
    throttle::ThrottleState,
};

/// Roughly 30 years, past any tick a session will live to see
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// The tick `interval` after `from`, intervals too large to schedule land in the far future
fn tick_after(from: Instant, interval: Duration) -> Instant {
    from.checked_add(interval)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

struct Inner {
    throttle: ThrottleState,
    session: Option<CancellationToken>,
}

/// A location tracking service, owns the throttle state and drives the heartbeat. Create one
/// per tracking session owner and share it with [Arc], fixes from the [LocationProvider] flow
/// through it to the [LocationListener].
pub struct LocationService<P: LocationProvider, L: LocationListener> {
    provider: P,
    listener: L,
    settings: ServiceSettings,
    inner: Mutex<Inner>,
}

impl<P: LocationProvider + 'static, L: LocationListener + 'static> LocationService<P, L> {
    pub fn new(settings: ServiceSettings, provider: P, listener: L) -> Self {
        let throttle = ThrottleState::new(settings.interval());
        Self {
            provider,
            listener,
            settings,
            inner: Mutex::new(Inner {
                throttle,
                session: None,
            }),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Start (or restart) tracking. Always succeeds from the caller's point of view, a provider
    /// that fails to start just never delivers fixes.
    pub async fn start(self: &Arc<Self>, request: UpdateRequest) -> bool {
        let mut inner = self.inner.lock().await;

        if let Some(old) = inner.session.take() {
            debug!("Replacing running location session");
            old.cancel();
            self.provider.stop_updates();
        }

        let accuracy = request
            .accuracy
            .resolve(|tier| self.provider.supports(tier));
        if accuracy != request.accuracy {
            debug!(
                "Accuracy {:?} unsupported, falling back to {accuracy:?}",
                request.accuracy
            );
        }
        let request = UpdateRequest {
            accuracy,
            distance_filter: request.distance_filter.max(0.0),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(why) = self.provider.start_updates(request, FixSender::new(tx)) {
            error!("Failed to start location updates: {why:?}");
        }

        inner.throttle.start();
        let cancel = CancellationToken::new();
        inner.session = Some(cancel.clone());

        info!(
            "Location service started ({:?}, {}m filter, {:?} interval)",
            request.accuracy,
            request.distance_filter,
            inner.throttle.interval()
        );

        tokio::spawn(self.clone().session_loop(rx, cancel));

        true
    }

    /// Stop tracking, halts the provider and the heartbeat. The last known fix is kept.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.session.take() {
            session.cancel();
        }
        inner.throttle.stop();
        self.provider.stop_updates();
        info!("Location service stopped");
        true
    }

    /// Set the interval from a millisecond string, unparseable values are ignored.
    pub async fn configure(&self, interval_millis: &str) -> bool {
        match parse_interval(interval_millis) {
            Some(interval) => {
                self.set_interval(interval).await;
            }
            None => debug!("Ignoring unusable interval {interval_millis:?}"),
        }
        true
    }

    /// Set the interval directly, returns whether it was applied
    pub async fn set_interval(&self, interval: Duration) -> bool {
        let applied = self.inner.lock().await.throttle.set_interval(interval);
        if applied {
            info!("Update interval set to {interval:?}");
        }
        applied
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.throttle.is_running()
    }

    /// Copy of the current throttle state
    pub async fn snapshot(&self) -> ThrottleState {
        self.inner.lock().await.throttle.clone()
    }

    /// Feed a raw fix in directly, for hosts that deliver fixes by callback instead of through
    /// a [FixSender].
    pub async fn on_fix(&self, fix: Fix) {
        let mut inner = self.inner.lock().await;
        if let Some(fix) = inner.throttle.on_fix(fix) {
            self.emit(fix);
        }
    }

    fn emit(&self, fix: Fix) {
        debug!(
            "Sending location {}, {} at {}",
            fix.latitude, fix.longitude, fix.timestamp
        );
        self.listener.on_fix(fix);
    }

    async fn session_fix(&self, fix: Fix, cancel: &CancellationToken) {
        let mut inner = self.inner.lock().await;
        // A restart may have happened while waiting on the lock
        if cancel.is_cancelled() {
            return;
        }
        if let Some(fix) = inner.throttle.on_fix(fix) {
            self.emit(fix);
        }
    }

    /// Returns the deadline of the following tick
    async fn session_tick(&self, deadline: Instant, cancel: &CancellationToken) -> Instant {
        let inner = self.inner.lock().await;
        if cancel.is_cancelled() {
            return deadline;
        }
        if let Some(fix) = inner.throttle.heartbeat() {
            debug!("Heartbeat fired, re-sending last known fix");
            self.emit(fix);
        }
        let interval = inner.throttle.interval();
        let now = Instant::now();
        let next = tick_after(deadline, interval);
        // Skip missed ticks rather than bursting to catch up
        if next <= now {
            tick_after(now, interval)
        } else {
            next
        }
    }

    /// Serially handles everything for one session: raw fixes in arrival order and the heartbeat
    async fn session_loop(
        self: Arc<Self>,
        mut fixes: mpsc::UnboundedReceiver<Fix>,
        cancel: CancellationToken,
    ) {
        let interval = self.inner.lock().await.throttle.interval();
        let mut deadline = tick_after(Instant::now(), interval);
        let mut provider_open = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    break;
                }

                fix = fixes.recv(), if provider_open => {
                    match fix {
                        Some(fix) => self.session_fix(fix, &cancel).await,
                        None => {
                            debug!("Provider closed its fix stream");
                            provider_open = false;
                        }
                    }
                }

                _ = sleep_until(deadline) => {
                    deadline = self.session_tick(deadline, &cancel).await;
                }
            }
        }

        debug!("Location session ended");
    }
}
