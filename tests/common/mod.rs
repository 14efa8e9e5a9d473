#![allow(dead_code)]

use std::collections::HashMap;
use std::env;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use mouse_commander::capture::{EventHandler, PointerEvent, PointerHook};
use mouse_commander::HookError;

/// Env guard that restores previous env vars on drop.
pub struct EnvGuard {
    old: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let mut old = HashMap::new();
        for (k, v) in vars {
            old.insert((*k).to_string(), env::var(k).ok());
            env::set_var(k, v);
        }
        Self { old }
    }

    pub fn unset(keys: &[&str]) -> Self {
        let mut old = HashMap::new();
        for k in keys {
            old.insert((*k).to_string(), env::var(k).ok());
            env::remove_var(k);
        }
        Self { old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, prev) in self.old.drain() {
            match prev {
                Some(v) => env::set_var(k, v),
                None => env::remove_var(k),
            }
        }
    }
}

/// Counters shared between a [`FakeHook`] and the test holding it.
#[derive(Default)]
pub struct HookStats {
    pub installs: AtomicUsize,
    pub uninstalls: AtomicUsize,
    pub handler: Mutex<Option<EventHandler>>,
}

impl HookStats {
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn uninstalls(&self) -> usize {
        self.uninstalls.load(Ordering::SeqCst)
    }

    /// Deliver an event as the OS hook thread would.
    pub fn fire(&self, event: PointerEvent) {
        let handler = self.handler.lock().unwrap().clone();
        handler.expect("hook not installed")(event);
    }

    pub fn is_installed(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }
}

/// Pointer hook that records calls instead of touching the OS.
pub struct FakeHook {
    pub stats: Arc<HookStats>,
    pub fail: bool,
}

impl FakeHook {
    pub fn new() -> (Box<dyn PointerHook>, Arc<HookStats>) {
        let stats = Arc::new(HookStats::default());
        let hook = FakeHook {
            stats: Arc::clone(&stats),
            fail: false,
        };
        (Box::new(hook), stats)
    }

    pub fn failing() -> (Box<dyn PointerHook>, Arc<HookStats>) {
        let stats = Arc::new(HookStats::default());
        let hook = FakeHook {
            stats: Arc::clone(&stats),
            fail: true,
        };
        (Box::new(hook), stats)
    }
}

impl PointerHook for FakeHook {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn install(&mut self, handler: EventHandler) -> Result<(), HookError> {
        if self.fail {
            return Err(HookError::Install("denied by test".into()));
        }
        self.stats.installs.fetch_add(1, Ordering::SeqCst);
        *self.stats.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    fn uninstall(&mut self) {
        self.stats.uninstalls.fetch_add(1, Ordering::SeqCst);
        self.stats.handler.lock().unwrap().take();
    }
}

/// In-memory stdout that the test can inspect while the host still owns a clone.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A stdin stand-in fed chunk by chunk. Reads block until the next chunk arrives;
/// dropping the feeding side is end of stream.
pub struct ScriptedInput {
    chunks: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl ScriptedInput {
    pub fn new() -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                chunks: rx,
                pending: Vec::new(),
            },
        )
    }
}

impl Read for ScriptedInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            match self.chunks.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Browser-side framing of a raw body.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = (body.len() as u32).to_ne_bytes().to_vec();
    out.extend_from_slice(body);
    out
}
