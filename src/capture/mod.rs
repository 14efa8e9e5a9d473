//! Global pointer capture.
//!
//! [`PointerEventCapturer`] owns a [`PointerHook`] backend and turns every event it
//! delivers into an outbound frame on the native-messaging channel. Backends:
//!
//! - Windows: a `WH_MOUSE_LL` hook on its own message-pump thread.
//! - Other targets with the `rdev` feature: the rdev global listener.
//! - Anything else: [`UnsupportedHook`], which refuses to install.

#[cfg(all(not(windows), feature = "rdev"))]
mod rdev_hook;
#[cfg(windows)]
mod win32;

#[cfg(all(not(windows), feature = "rdev"))]
pub use rdev_hook::RdevHook;
#[cfg(windows)]
pub use win32::LowLevelMouseHook;

use std::io::{self, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::codec::{self, OutboundFrame};
use crate::error::HookError;

/// Physical pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
    /// Side/extra buttons, identified by the backend's raw number.
    Other(u8),
}

/// A button transition. Coordinates are captured but never sent to the browser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    pub button: PointerButton,
    pub pressed: bool,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollEvent {
    pub delta_x: i64,
    pub delta_y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Click(ClickEvent),
    Scroll(ScrollEvent),
}

/// Callback a hook backend invokes on its delivery thread.
pub type EventHandler = Arc<dyn Fn(PointerEvent) + Send + Sync>;

/// An OS facility delivering global pointer events.
///
/// `install` and `uninstall` are never called concurrently; the lifecycle
/// controller is their only caller.
pub trait PointerHook: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Start delivering events to `handler`.
    fn install(&mut self, handler: EventHandler) -> Result<(), HookError>;

    /// Stop delivering events and release the hook. Must not fail.
    fn uninstall(&mut self);
}

/// Backend used when the build has no way to hook the pointer.
#[derive(Debug, Default)]
pub struct UnsupportedHook;

impl PointerHook for UnsupportedHook {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn install(&mut self, _handler: EventHandler) -> Result<(), HookError> {
        Err(HookError::Unsupported)
    }

    fn uninstall(&mut self) {}
}

/// The pointer hook for this platform/build.
pub fn system_hook() -> Box<dyn PointerHook> {
    #[cfg(windows)]
    {
        Box::new(LowLevelMouseHook::new())
    }
    #[cfg(all(not(windows), feature = "rdev"))]
    {
        Box::new(RdevHook::new())
    }
    #[cfg(all(not(windows), not(feature = "rdev")))]
    {
        Box::new(UnsupportedHook)
    }
}

/// A process-wide thread parked in a backend's blocking `listen` call.
///
/// Such calls cannot be torn down, so the thread is started at most once. A
/// `listen` that fails within `grace` fails the install that started it; a later
/// failure is remembered and fails every install after it.
#[cfg_attr(any(windows, not(feature = "rdev")), allow(dead_code))]
pub(crate) struct BackgroundListener {
    name: &'static str,
    started: OnceCell<()>,
    failure: Mutex<Option<String>>,
}

#[cfg_attr(any(windows, not(feature = "rdev")), allow(dead_code))]
impl BackgroundListener {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self {
            name,
            started: OnceCell::new(),
            failure: parking_lot::const_mutex(None),
        }
    }

    pub(crate) fn ensure_running<F>(
        &'static self,
        listen: F,
        grace: Duration,
    ) -> Result<(), HookError>
    where
        F: FnOnce() -> Result<(), String> + Send + 'static,
    {
        if let Some(reason) = self.failure.lock().clone() {
            return Err(HookError::Install(reason));
        }
        self.started.get_or_try_init(|| -> Result<(), HookError> {
            let (failed_tx, failed_rx) = mpsc::sync_channel(1);
            thread::Builder::new()
                .name(self.name.into())
                .spawn(move || {
                    let reason = match listen() {
                        Ok(()) => "listener returned".to_string(),
                        Err(reason) => reason,
                    };
                    error!(listener = self.name, %reason, "pointer listener stopped");
                    *self.failure.lock() = Some(reason.clone());
                    let _ = failed_tx.send(reason);
                })?;
            match failed_rx.recv_timeout(grace) {
                Err(mpsc::RecvTimeoutError::Timeout) => Ok(()),
                Ok(reason) => Err(HookError::Install(reason)),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    Err(HookError::Install("listener thread exited".into()))
                }
            }
        })?;
        Ok(())
    }
}

/// Shared handle to the outbound side of the channel.
///
/// Each frame goes out under the lock as one contiguous write, so frames from the
/// hook thread never interleave with anything else written through this handle.
#[derive(Clone)]
pub struct FrameWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl FrameWriter {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn write(&self, frame: &OutboundFrame) -> io::Result<()> {
        let mut guard = self.inner.lock();
        codec::write_frame(&mut **guard, frame)
    }
}

/// Encode one pointer event and write it. Unsupported buttons are dropped.
pub fn relay(writer: &FrameWriter, event: PointerEvent) {
    let frame = match event {
        PointerEvent::Click(click) => match codec::encode_click(click.button, click.pressed) {
            Some(frame) => frame,
            None => {
                trace!(button = ?click.button, "dropping click from unmapped button");
                return;
            }
        },
        PointerEvent::Scroll(scroll) => codec::encode_scroll(scroll.delta_y),
    };
    if let Err(err) = writer.write(&frame) {
        // Usually the browser went away; the reader will see EOF and shut us down.
        warn!(%err, "failed to write pointer frame");
    }
}

/// Installs the hook while capture is enabled and relays its events.
pub struct PointerEventCapturer {
    hook: Box<dyn PointerHook>,
    writer: FrameWriter,
    running: bool,
}

impl PointerEventCapturer {
    pub fn new(hook: Box<dyn PointerHook>, writer: FrameWriter) -> Self {
        Self {
            hook,
            writer,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Install the hook. No-op if already running.
    pub fn start(&mut self) -> Result<(), HookError> {
        if self.running {
            return Ok(());
        }
        let writer = self.writer.clone();
        let handler: EventHandler = Arc::new(move |event| relay(&writer, event));
        self.hook.install(handler)?;
        self.running = true;
        info!(backend = self.hook.name(), "pointer hook installed");
        Ok(())
    }

    /// Uninstall the hook. No-op if not running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.hook.uninstall();
        self.running = false;
        debug!(backend = self.hook.name(), "pointer hook removed");
    }
}

impl Drop for PointerEventCapturer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const GRACE: Duration = Duration::from_millis(100);

    #[test]
    fn listener_failing_at_startup_fails_the_install() {
        static LISTENER: BackgroundListener = BackgroundListener::new("failing-listener");
        static STARTS: AtomicUsize = AtomicUsize::new(0);

        let err = LISTENER
            .ensure_running(
                || {
                    STARTS.fetch_add(1, Ordering::SeqCst);
                    Err("no display".into())
                },
                GRACE,
            )
            .expect_err("listen failed");
        assert!(matches!(err, HookError::Install(ref reason) if reason == "no display"));

        // Remembered: no second listener is spawned.
        let err = LISTENER.ensure_running(|| Ok(()), GRACE).expect_err("still failed");
        assert!(matches!(err, HookError::Install(_)));
        assert_eq!(STARTS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn running_listener_is_started_once() {
        static LISTENER: BackgroundListener = BackgroundListener::new("parked-listener");
        static STARTS: AtomicUsize = AtomicUsize::new(0);

        let listen = || -> Result<(), String> {
            STARTS.fetch_add(1, Ordering::SeqCst);
            loop {
                thread::park();
            }
        };
        LISTENER.ensure_running(listen, GRACE).unwrap();
        LISTENER.ensure_running(listen, GRACE).unwrap();
        assert_eq!(STARTS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_listener_failure_fails_later_installs() {
        static LISTENER: BackgroundListener = BackgroundListener::new("late-listener");

        LISTENER
            .ensure_running(
                || {
                    thread::sleep(Duration::from_millis(300));
                    Err("session ended".into())
                },
                Duration::from_millis(20),
            )
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while LISTENER.failure.lock().is_none() {
            assert!(std::time::Instant::now() < deadline, "listener never failed");
            thread::sleep(Duration::from_millis(10));
        }
        let err = LISTENER.ensure_running(|| Ok(()), GRACE).expect_err("dead listener");
        assert!(matches!(err, HookError::Install(ref reason) if reason == "session ended"));
    }
}
