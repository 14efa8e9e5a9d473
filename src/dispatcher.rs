//! Command dispatch off the bounded inbound queue.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Control token the extension sends right after connecting.
pub const START_SIGNAL: &str = "start_signal";

/// Queue capacity used when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// What travels through the inbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem {
    /// Tells the dispatcher to exit. Never produced by decoding.
    Stop,
    Payload(Value),
}

/// Messages with meaning to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
}

impl Command {
    /// Recognize a control token. Anything else is `None` and gets ignored.
    pub fn from_message(message: &Value) -> Option<Self> {
        match message.as_str() {
            Some(START_SIGNAL) => Some(Self::Start),
            _ => None,
        }
    }
}

/// The bounded FIFO between the reader and the dispatcher.
///
/// # Panics
///
/// Panics if `capacity` is zero; [`crate::config::HostConfig`] rejects that.
pub fn message_queue(capacity: usize) -> (mpsc::Sender<QueueItem>, mpsc::Receiver<QueueItem>) {
    mpsc::channel(capacity)
}

/// Drains the queue on its own task and fires the start callback.
pub struct CommandDispatcher {
    stop_tx: mpsc::Sender<QueueItem>,
    worker: Option<JoinHandle<()>>,
}

impl CommandDispatcher {
    /// Spawn the worker. `stop_tx` must feed `queue`; it is used only for the
    /// stop sentinel. Must be called inside a Tokio runtime.
    pub fn spawn<F>(
        queue: mpsc::Receiver<QueueItem>,
        stop_tx: mpsc::Sender<QueueItem>,
        on_start: F,
    ) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let worker = tokio::spawn(drain(queue, on_start));
        Self {
            stop_tx,
            worker: Some(worker),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Queue the stop sentinel behind everything already queued and wait for the
    /// worker to exit. Safe to call more than once.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Fails only if the worker is already gone.
        let _ = self.stop_tx.send(QueueItem::Stop).await;
        if let Err(err) = worker.await {
            warn!(%err, "command dispatcher task failed");
        }
    }
}

async fn drain<F>(mut queue: mpsc::Receiver<QueueItem>, mut on_start: F)
where
    F: FnMut(),
{
    while let Some(item) = queue.recv().await {
        let message = match item {
            QueueItem::Stop => break,
            QueueItem::Payload(message) => message,
        };
        match Command::from_message(&message) {
            Some(Command::Start) => {
                debug!("start signal received");
                on_start();
            }
            None => trace!(%message, "ignoring unrecognized message"),
        }
    }
    debug!("command dispatcher stopped");
}
