//! Enable/disable state machine for pointer capture.
//!
//! The controller is owned by the host loop, which is the only code that mutates
//! it. Everyone else (the dispatcher, a tray menu, tests) goes through a
//! [`ControlHandle`], which posts requests to that loop and can watch the
//! resulting `enabled` flag.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::capture::PointerEventCapturer;
use crate::dispatcher::CommandDispatcher;
use crate::error::HookError;
use crate::reader::InboundReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Disabled,
    Enabled,
}

impl CaptureState {
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

/// Requests accepted by the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    SetEnabled(bool),
    Quit,
}

/// Callback run on every state transition.
pub type TransitionObserver = Box<dyn Fn(CaptureState) + Send + Sync>;

/// Thread-safe handle for driving the host from outside its loop.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    requests: mpsc::UnboundedSender<ControlRequest>,
    enabled: watch::Receiver<bool>,
}

impl ControlHandle {
    pub(crate) fn new(
        requests: mpsc::UnboundedSender<ControlRequest>,
        enabled: watch::Receiver<bool>,
    ) -> Self {
        Self { requests, enabled }
    }

    /// Ask the host to enable or disable capture. Returns `false` if the host loop
    /// is gone.
    pub fn enable(&self, enabled: bool) -> bool {
        self.requests
            .send(ControlRequest::SetEnabled(enabled))
            .is_ok()
    }

    /// Ask the host to shut down. Returns `false` if the host loop is gone.
    pub fn request_quit(&self) -> bool {
        self.requests.send(ControlRequest::Quit).is_ok()
    }

    /// Capture state as last published by the controller.
    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// A receiver that wakes on every transition, e.g. to keep a menu toggle in sync.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.enabled.clone()
    }
}

pub struct LifecycleController {
    state: CaptureState,
    capturer: PointerEventCapturer,
    enabled_tx: watch::Sender<bool>,
    observers: Vec<TransitionObserver>,
}

impl LifecycleController {
    pub fn new(capturer: PointerEventCapturer) -> Self {
        let (enabled_tx, _) = watch::channel(false);
        Self {
            state: CaptureState::Disabled,
            capturer,
            enabled_tx,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.enabled_tx.subscribe()
    }

    pub fn observe<F>(&mut self, observer: F)
    where
        F: Fn(CaptureState) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Install the hook and move to `Enabled`. Returns whether a transition
    /// happened. On failure the state stays `Disabled`.
    pub fn enable(&mut self) -> Result<bool, HookError> {
        if self.state.is_enabled() {
            return Ok(false);
        }
        if let Err(err) = self.capturer.start() {
            // Re-publish so a toggle that optimistically flipped goes back.
            self.enabled_tx.send_replace(false);
            return Err(err);
        }
        self.transition(CaptureState::Enabled);
        Ok(true)
    }

    /// Remove the hook and move to `Disabled`. Returns whether a transition happened.
    pub fn disable(&mut self) -> bool {
        if !self.state.is_enabled() {
            return false;
        }
        self.capturer.stop();
        self.transition(CaptureState::Disabled);
        true
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<bool, HookError> {
        if enabled {
            self.enable()
        } else {
            Ok(self.disable())
        }
    }

    /// Disable capture, then stop the dispatcher, then release the reader.
    pub async fn shutdown(&mut self, dispatcher: &mut CommandDispatcher, reader: InboundReader) {
        self.disable();
        dispatcher.stop().await;
        reader.stop();
        debug!("lifecycle shut down");
    }

    fn transition(&mut self, next: CaptureState) {
        info!(from = ?self.state, to = ?next, "capture state changed");
        self.state = next;
        self.enabled_tx.send_replace(next.is_enabled());
        for observer in &self.observers {
            observer(next);
        }
    }
}
