//! The blocking read side of the native-messaging channel.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::codec;
use crate::dispatcher::QueueItem;
use crate::error::NmError;

/// Why the read loop ended.
#[derive(Debug)]
pub enum ReaderExit {
    /// Orderly end of stream between frames.
    Closed,
    /// The dispatcher dropped the queue.
    QueueClosed,
    /// A broken frame. There is no resync marker, so reading stops here.
    Failed(NmError),
}

/// Decode frames from `input` into `queue` until the channel closes or breaks.
///
/// Blocks on the stream and, when the queue is full, on the queue. Must not run on
/// a Tokio worker thread.
pub fn read_loop<R: Read>(
    mut input: R,
    queue: &mpsc::Sender<QueueItem>,
    max_message_bytes: usize,
) -> ReaderExit {
    loop {
        match codec::read_inbound(&mut input, max_message_bytes) {
            Ok(Some(message)) => {
                if queue.blocking_send(QueueItem::Payload(message)).is_err() {
                    return ReaderExit::QueueClosed;
                }
            }
            Ok(None) => return ReaderExit::Closed,
            Err(err) => return ReaderExit::Failed(err),
        }
    }
}

/// Owns the reader thread for the life of the process.
pub struct InboundReader {
    exit: Option<oneshot::Receiver<ReaderExit>>,
    thread: JoinHandle<()>,
}

impl InboundReader {
    pub fn spawn<R>(
        input: R,
        queue: mpsc::Sender<QueueItem>,
        max_message_bytes: usize,
    ) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (exit_tx, exit_rx) = oneshot::channel();
        let thread = thread::Builder::new()
            .name("nm-reader".into())
            .spawn(move || {
                let exit = read_loop(input, &queue, max_message_bytes);
                match &exit {
                    ReaderExit::Closed => info!("native messaging channel closed"),
                    ReaderExit::QueueClosed => debug!("inbound queue closed, reader exiting"),
                    ReaderExit::Failed(err) => error!(%err, "native messaging channel broken"),
                }
                let _ = exit_tx.send(exit);
            })?;
        Ok(Self {
            exit: Some(exit_rx),
            thread,
        })
    }

    /// Wait for the read loop to end. Cancel-safe; resolves once, after which it
    /// pends forever.
    pub async fn closed(&mut self) -> ReaderExit {
        let Some(rx) = self.exit.as_mut() else {
            return std::future::pending().await;
        };
        let exit = rx.await.unwrap_or_else(|_| {
            ReaderExit::Failed(NmError::Io(io::Error::other("reader thread panicked")))
        });
        self.exit = None;
        exit
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Reap the thread if it is done. A reader still blocked on a live channel is
    /// left detached; it ends with the process.
    pub fn stop(self) {
        if self.thread.is_finished() {
            let _ = self.thread.join();
        } else {
            debug!("reader still blocked on input, detaching");
        }
    }
}
