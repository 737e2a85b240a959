use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use background_location::{
    AccuracyTier, ControlEcho, Fix, FixSender, LocationEvent, LocationListener, LocationProvider,
    LocationService, MethodCall, MethodChannel, MethodResponse, ServiceSettings, UpdateRequest,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::yield_now, time::Instant};

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// One line of a simulation script
pub enum SimStep {
    /// Invoke a method on the channel as the app layer would
    Call(MethodCall),
    /// Have the platform deliver a raw fix
    Fix(Fix),
    /// Let time pass
    Wait { millis: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Something the app layer observed, with how far into the run it happened
pub enum SimOutput {
    Event {
        elapsed_ms: u64,
        event: LocationEvent,
    },
    Response {
        elapsed_ms: u64,
        method: String,
        response: MethodResponse,
    },
}

/// Parse a script, one JSON [SimStep] per line. Blank lines and lines starting with `#` are
/// skipped.
pub fn parse_script(text: &str) -> Result<Vec<SimStep>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid step on line {}", i + 1))
        })
        .collect()
}

/// A platform whose fixes come from the script
#[derive(Default)]
pub struct ScriptedProvider {
    unsupported: Vec<AccuracyTier>,
    sender: Mutex<Option<FixSender>>,
    last_request: Mutex<Option<UpdateRequest>>,
}

impl ScriptedProvider {
    pub fn new(unsupported: Vec<AccuracyTier>) -> Self {
        Self {
            unsupported,
            ..Default::default()
        }
    }

    /// What the service last asked the platform for
    pub fn last_request(&self) -> Option<UpdateRequest> {
        self.last_request.lock().ok().and_then(|r| *r)
    }

    /// Deliver a fix into the active session, false if updates aren't running
    pub fn push(&self, fix: Fix) -> bool {
        self.sender
            .lock()
            .map(|s| s.as_ref().is_some_and(|tx| tx.send(fix)))
            .unwrap_or(false)
    }
}

impl LocationProvider for ScriptedProvider {
    fn supports(&self, tier: AccuracyTier) -> bool {
        !self.unsupported.contains(&tier)
    }

    fn start_updates(&self, request: UpdateRequest, fixes: FixSender) -> Result {
        debug!("Scripted updates started with {request:?}");
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }
        let mut sender = self
            .sender
            .lock()
            .map_err(|_| anyhow!("Scripted provider lock poisoned"))?;
        *sender = Some(fixes);
        Ok(())
    }

    fn stop_updates(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

/// Forwards everything the consumer would see into a channel
pub struct ChannelListener {
    start: Instant,
    out: mpsc::UnboundedSender<SimOutput>,
}

impl ChannelListener {
    pub fn new(start: Instant, out: mpsc::UnboundedSender<SimOutput>) -> Self {
        Self { start, out }
    }

    fn push(&self, event: LocationEvent) {
        let output = SimOutput::Event {
            elapsed_ms: elapsed_ms(self.start),
            event,
        };
        self.out.send(output).ok();
    }
}

impl LocationListener for ChannelListener {
    fn on_fix(&self, fix: Fix) {
        self.push(fix.into());
    }

    fn on_control(&self, echo: ControlEcho) {
        self.push(echo.into());
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub type SimService = LocationService<ScriptedProvider, ChannelListener>;

/// Replay `steps` against a fresh service, sending every observation to `out`.
/// Returns the service so callers can inspect its final state.
pub async fn run_script(
    steps: Vec<SimStep>,
    settings: ServiceSettings,
    unsupported: Vec<AccuracyTier>,
    out: mpsc::UnboundedSender<SimOutput>,
) -> Arc<SimService> {
    let start = Instant::now();
    let listener = ChannelListener::new(start, out.clone());
    let service = Arc::new(LocationService::new(
        settings,
        ScriptedProvider::new(unsupported),
        listener,
    ));
    let channel = MethodChannel::new(service.clone());

    for step in steps {
        match step {
            SimStep::Call(call) => {
                let method = call.method.clone();
                let response = channel.handle(call).await;
                out.send(SimOutput::Response {
                    elapsed_ms: elapsed_ms(start),
                    method,
                    response,
                })
                .ok();
            }
            SimStep::Fix(fix) => {
                if !service.provider().push(fix) {
                    warn!("Location updates aren't running, dropping fix");
                }
                // Let the session handle it before the next step
                for _ in 0..4 {
                    yield_now().await;
                }
            }
            SimStep::Wait { millis } => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
        }
    }

    service
}
