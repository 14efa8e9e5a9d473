//! `WH_MOUSE_LL` backend.
//!
//! Low-level hooks are delivered through the message queue of the thread that
//! installed them, so the hook lives on a dedicated thread running a message pump.
//! Uninstalling posts `WM_QUIT` to that thread and joins it.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};
use windows::Win32::Foundation::{BOOL, HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION, HHOOK, MSG,
    MSLLHOOKSTRUCT, PM_NOREMOVE, WH_MOUSE_LL, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN,
    WM_MBUTTONUP, WM_MOUSEHWHEEL, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP,
    WM_USER, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

use super::{ClickEvent, EventHandler, PointerButton, PointerEvent, PointerHook, ScrollEvent};
use crate::error::HookError;

// The hook procedure is a bare function; it finds the current handler here.
static HANDLER: Mutex<Option<EventHandler>> = parking_lot::const_mutex(None);

struct PumpThread {
    thread_id: u32,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct LowLevelMouseHook {
    pump: Option<PumpThread>,
}

impl LowLevelMouseHook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PointerHook for LowLevelMouseHook {
    fn name(&self) -> &'static str {
        "win32-ll-mouse"
    }

    fn install(&mut self, handler: EventHandler) -> Result<(), HookError> {
        if self.pump.is_some() {
            return Ok(());
        }
        *HANDLER.lock() = Some(handler);

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name("mouse-hook".into())
            .spawn(move || pump(ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                debug!(thread_id, "mouse hook pump running");
                self.pump = Some(PumpThread { thread_id, handle });
                Ok(())
            }
            Ok(Err(message)) => {
                let _ = handle.join();
                HANDLER.lock().take();
                Err(HookError::Install(message))
            }
            Err(_) => {
                let _ = handle.join();
                HANDLER.lock().take();
                Err(HookError::Install(
                    "hook thread exited before reporting".into(),
                ))
            }
        }
    }

    fn uninstall(&mut self) {
        let Some(pump) = self.pump.take() else {
            return;
        };
        unsafe {
            if let Err(err) = PostThreadMessageW(pump.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) {
                warn!(%err, "failed to post WM_QUIT to mouse hook thread");
            }
        }
        if pump.handle.join().is_err() {
            warn!("mouse hook thread panicked");
        }
        HANDLER.lock().take();
    }
}

impl Drop for LowLevelMouseHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn pump(ready: mpsc::SyncSender<Result<u32, String>>) {
    let mut msg = MSG::default();
    unsafe {
        // Force creation of this thread's message queue before anyone posts to it.
        let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);

        let module = match GetModuleHandleW(None) {
            Ok(module) => module,
            Err(err) => {
                let _ = ready.send(Err(err.to_string()));
                return;
            }
        };
        let hinst: HINSTANCE = module.into();
        let hook = match SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_proc), hinst, 0) {
            Ok(hook) => hook,
            Err(err) => {
                let _ = ready.send(Err(err.to_string()));
                return;
            }
        };

        let _ = ready.send(Ok(GetCurrentThreadId()));

        while keep_pumping(GetMessageW(&mut msg, None, 0, 0)) {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(hook);
    }
}

/// `GetMessageW` returns 0 for `WM_QUIT` and -1 on failure.
fn keep_pumping(result: BOOL) -> bool {
    match result.0 {
        -1 => {
            warn!("GetMessageW failed, removing mouse hook");
            false
        }
        0 => false,
        _ => true,
    }
}

unsafe extern "system" fn mouse_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let data = &*(lparam.0 as *const MSLLHOOKSTRUCT);
        if let Some(event) = translate(wparam.0 as u32, data) {
            // Clone out so the handler runs without the lock held.
            let handler = HANDLER.lock().clone();
            if let Some(handler) = handler {
                handler(event);
            }
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

fn translate(message: u32, data: &MSLLHOOKSTRUCT) -> Option<PointerEvent> {
    let (x, y) = (f64::from(data.pt.x), f64::from(data.pt.y));
    let high_word = (data.mouseData >> 16) as u16;
    let click = |button, pressed| {
        Some(PointerEvent::Click(ClickEvent {
            button,
            pressed,
            x,
            y,
        }))
    };
    match message {
        WM_LBUTTONDOWN => click(PointerButton::Left, true),
        WM_LBUTTONUP => click(PointerButton::Left, false),
        WM_MBUTTONDOWN => click(PointerButton::Middle, true),
        WM_MBUTTONUP => click(PointerButton::Middle, false),
        WM_RBUTTONDOWN => click(PointerButton::Right, true),
        WM_RBUTTONUP => click(PointerButton::Right, false),
        WM_XBUTTONDOWN => click(PointerButton::Other(high_word as u8), true),
        WM_XBUTTONUP => click(PointerButton::Other(high_word as u8), false),
        WM_MOUSEWHEEL => Some(PointerEvent::Scroll(ScrollEvent {
            delta_x: 0,
            delta_y: i64::from(high_word as i16),
        })),
        WM_MOUSEHWHEEL => Some(PointerEvent::Scroll(ScrollEvent {
            delta_x: i64::from(high_word as i16),
            delta_y: 0,
        })),
        _ => None,
    }
}
