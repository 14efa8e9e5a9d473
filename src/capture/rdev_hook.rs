//! rdev backend for non-Windows targets.
//!
//! `rdev::listen` blocks forever and cannot be torn down, so the listener thread is
//! started once per process and install/uninstall swap the sink it forwards to.
//! Without a display server or input permission, `listen` fails at once; that
//! fails the install.

use std::time::Duration;

use parking_lot::Mutex;
use rdev::{Button, Event, EventType};

use super::{
    BackgroundListener, ClickEvent, EventHandler, PointerButton, PointerEvent, PointerHook,
    ScrollEvent,
};
use crate::error::HookError;

const STARTUP_GRACE: Duration = Duration::from_millis(250);

static SINK: Mutex<Option<EventHandler>> = parking_lot::const_mutex(None);
// rdev reports position only on moves; clicks reuse the last one.
static POSITION: Mutex<(f64, f64)> = parking_lot::const_mutex((0.0, 0.0));
static LISTENER: BackgroundListener = BackgroundListener::new("rdev-listener");

#[derive(Debug, Default)]
pub struct RdevHook {
    installed: bool,
}

impl RdevHook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PointerHook for RdevHook {
    fn name(&self) -> &'static str {
        "rdev"
    }

    fn install(&mut self, handler: EventHandler) -> Result<(), HookError> {
        LISTENER.ensure_running(
            || rdev::listen(dispatch).map_err(|err| format!("rdev listen failed: {err:?}")),
            STARTUP_GRACE,
        )?;
        *SINK.lock() = Some(handler);
        self.installed = true;
        Ok(())
    }

    fn uninstall(&mut self) {
        if self.installed {
            SINK.lock().take();
            self.installed = false;
        }
    }
}

fn dispatch(event: Event) {
    let pointer = match event.event_type {
        EventType::MouseMove { x, y } => {
            *POSITION.lock() = (x, y);
            return;
        }
        EventType::ButtonPress(button) => click(button, true),
        EventType::ButtonRelease(button) => click(button, false),
        EventType::Wheel { delta_x, delta_y } => PointerEvent::Scroll(ScrollEvent { delta_x, delta_y }),
        _ => return,
    };
    let handler = SINK.lock().clone();
    if let Some(handler) = handler {
        handler(pointer);
    }
}

fn click(button: Button, pressed: bool) -> PointerEvent {
    let (x, y) = *POSITION.lock();
    let button = match button {
        Button::Left => PointerButton::Left,
        Button::Middle => PointerButton::Middle,
        Button::Right => PointerButton::Right,
        Button::Unknown(raw) => PointerButton::Other(raw),
    };
    PointerEvent::Click(ClickEvent {
        button,
        pressed,
        x,
        y,
    })
}
