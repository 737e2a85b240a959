use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use anyhow::bail;

use crate::{
    AccuracyTier, ControlEcho, Fix, FixPayload, FixSender, LocationEvent, LocationListener,
    LocationProvider, UpdateRequest, prelude::*,
};

#[derive(Default)]
pub struct MockProvider {
    unsupported: Vec<AccuracyTier>,
    unauthorized: bool,
    last_request: Mutex<Option<UpdateRequest>>,
    sender: Mutex<Option<FixSender>>,
    stopped: AtomicBool,
}

impl MockProvider {
    pub fn without(unsupported: &[AccuracyTier]) -> Self {
        Self {
            unsupported: unsupported.to_vec(),
            ..Default::default()
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            unauthorized: true,
            ..Default::default()
        }
    }

    pub fn last_request(&self) -> Option<UpdateRequest> {
        *self.last_request.lock().unwrap()
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Deliver a fix the way the platform would, false if no session is listening
    pub fn push(&self, fix: Fix) -> bool {
        self.sender
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.send(fix))
    }
}

impl LocationProvider for MockProvider {
    fn supports(&self, tier: AccuracyTier) -> bool {
        !self.unsupported.contains(&tier)
    }

    fn start_updates(&self, request: UpdateRequest, fixes: FixSender) -> Result {
        *self.last_request.lock().unwrap() = Some(request);
        self.stopped.store(false, Ordering::SeqCst);
        if self.unauthorized {
            bail!("Location permission not granted");
        }
        *self.sender.lock().unwrap() = Some(fixes);
        Ok(())
    }

    fn stop_updates(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.sender.lock().unwrap().take();
    }
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<LocationEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<LocationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn fixes(&self) -> Vec<FixPayload> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                LocationEvent::Fix(payload) => Some(*payload),
                LocationEvent::Control(_) => None,
            })
            .collect()
    }
}

impl LocationListener for RecordingListener {
    fn on_fix(&self, fix: Fix) {
        self.events.lock().unwrap().push(fix.into());
    }

    fn on_control(&self, echo: ControlEcho) {
        self.events.lock().unwrap().push(echo.into());
    }
}
