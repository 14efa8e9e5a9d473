//! The running host: one native-messaging channel, one control loop.

use std::io::{Read, Write};

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::capture::{FrameWriter, PointerEventCapturer, PointerHook};
use crate::config::HostConfig;
use crate::dispatcher::{message_queue, CommandDispatcher};
use crate::error::NmError;
use crate::lifecycle::{CaptureState, ControlHandle, ControlRequest, LifecycleController};
use crate::reader::{InboundReader, ReaderExit};

/// How [`Host::run`] ended.
#[derive(Debug)]
pub enum HostExit {
    /// The browser closed the channel.
    Closed,
    /// Someone called [`ControlHandle::request_quit`].
    Quit,
    /// The inbound stream broke mid-frame.
    Failed(NmError),
}

impl HostExit {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Closed | Self::Quit => 0,
            Self::Failed(_) => 1,
        }
    }
}

pub struct Host {
    config: HostConfig,
    controller: LifecycleController,
    requests_tx: mpsc::UnboundedSender<ControlRequest>,
    requests_rx: mpsc::UnboundedReceiver<ControlRequest>,
}

impl Host {
    /// Build a host that writes pointer frames to `output` (stdout in production).
    pub fn new<W>(config: HostConfig, hook: Box<dyn PointerHook>, output: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let capturer = PointerEventCapturer::new(hook, FrameWriter::new(output));
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        Self {
            config,
            controller: LifecycleController::new(capturer),
            requests_tx,
            requests_rx,
        }
    }

    pub fn control(&self) -> ControlHandle {
        ControlHandle::new(self.requests_tx.clone(), self.controller.subscribe())
    }

    /// Register a callback for capture state transitions.
    pub fn observe<F>(&mut self, observer: F)
    where
        F: Fn(CaptureState) + Send + Sync + 'static,
    {
        self.controller.observe(observer);
    }

    /// Serve `input` (stdin in production) until the channel closes, breaks, or a
    /// quit is requested, then shut everything down in order.
    pub async fn run<R>(mut self, input: R) -> Result<HostExit, NmError>
    where
        R: Read + Send + 'static,
    {
        let (queue_tx, queue_rx) = message_queue(self.config.queue_capacity);
        let control = self.control();
        let mut dispatcher = CommandDispatcher::spawn(queue_rx, queue_tx.clone(), move || {
            control.enable(true);
        });
        let mut reader = InboundReader::spawn(input, queue_tx, self.config.max_message_bytes)?;
        info!(
            queue_capacity = self.config.queue_capacity,
            "native messaging host running"
        );

        let exit = loop {
            tokio::select! {
                request = self.requests_rx.recv() => match request {
                    Some(ControlRequest::SetEnabled(enabled)) => {
                        if let Err(err) = self.controller.set_enabled(enabled) {
                            error!(%err, "could not enable pointer capture");
                        }
                    }
                    // The host holds a sender, so `None` cannot happen; treat it as quit.
                    Some(ControlRequest::Quit) | None => break HostExit::Quit,
                },
                reader_exit = reader.closed() => break match reader_exit {
                    ReaderExit::Closed | ReaderExit::QueueClosed => HostExit::Closed,
                    ReaderExit::Failed(err) => HostExit::Failed(err),
                },
            }
        };

        debug!(?exit, "shutting down");
        self.controller.shutdown(&mut dispatcher, reader).await;
        Ok(exit)
    }
}
