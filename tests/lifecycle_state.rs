mod common;

use std::sync::{Arc, Mutex};

use mouse_commander::capture::{
    relay, ClickEvent, FrameWriter, PointerButton, PointerEvent, PointerEventCapturer, ScrollEvent,
    UnsupportedHook,
};
use mouse_commander::{CaptureState, HookError, LifecycleController};

fn controller() -> (LifecycleController, Arc<common::HookStats>, common::SharedBuf) {
    let (hook, stats) = common::FakeHook::new();
    let out = common::SharedBuf::default();
    let capturer = PointerEventCapturer::new(hook, FrameWriter::new(out.clone()));
    (LifecycleController::new(capturer), stats, out)
}

#[test]
fn starts_disabled_without_a_hook() {
    let (ctl, stats, _) = controller();
    assert_eq!(ctl.state(), CaptureState::Disabled);
    assert_eq!(stats.installs(), 0);
    assert!(!*ctl.subscribe().borrow());
}

#[test]
fn enable_twice_installs_once() {
    let (mut ctl, stats, _) = controller();
    assert!(ctl.enable().unwrap());
    assert!(!ctl.enable().unwrap());
    assert_eq!(stats.installs(), 1);
    assert_eq!(ctl.state(), CaptureState::Enabled);
}

#[test]
fn disable_while_disabled_does_not_uninstall() {
    let (mut ctl, stats, _) = controller();
    assert!(!ctl.disable());
    assert_eq!(stats.uninstalls(), 0);

    ctl.enable().unwrap();
    assert!(ctl.disable());
    assert!(!ctl.disable());
    assert_eq!(stats.uninstalls(), 1);
    assert!(!stats.is_installed());
}

#[test]
fn observers_see_every_transition() {
    let (mut ctl, _, _) = controller();
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        ctl.observe(move |state| seen.lock().unwrap().push(state));
    }
    let rx = ctl.subscribe();

    ctl.set_enabled(true).unwrap();
    assert!(*rx.borrow());
    ctl.set_enabled(true).unwrap();
    ctl.set_enabled(false).unwrap();
    assert!(!*rx.borrow());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![CaptureState::Enabled, CaptureState::Disabled]
    );
}

#[test]
fn failed_install_stays_disabled() {
    let (hook, stats) = common::FakeHook::failing();
    let capturer = PointerEventCapturer::new(hook, FrameWriter::new(common::SharedBuf::default()));
    let mut ctl = LifecycleController::new(capturer);

    assert!(matches!(ctl.enable(), Err(HookError::Install(_))));
    assert_eq!(ctl.state(), CaptureState::Disabled);
    assert_eq!(stats.uninstalls(), 0);
    assert!(!ctl.disable());
}

#[test]
fn unsupported_backend_refuses_to_enable() {
    let capturer = PointerEventCapturer::new(
        Box::new(UnsupportedHook),
        FrameWriter::new(common::SharedBuf::default()),
    );
    let mut ctl = LifecycleController::new(capturer);
    assert!(matches!(ctl.enable(), Err(HookError::Unsupported)));
    assert_eq!(ctl.state(), CaptureState::Disabled);
}

#[test]
fn hook_events_become_frames_while_enabled() {
    let (mut ctl, stats, out) = controller();
    ctl.enable().unwrap();

    stats.fire(PointerEvent::Click(ClickEvent {
        button: PointerButton::Right,
        pressed: true,
        x: 10.0,
        y: 20.0,
    }));
    stats.fire(PointerEvent::Click(ClickEvent {
        button: PointerButton::Other(8),
        pressed: true,
        x: 0.0,
        y: 0.0,
    }));
    stats.fire(PointerEvent::Scroll(ScrollEvent {
        delta_x: 0,
        delta_y: -1,
    }));

    let mut expected = common::frame(b"\"c12\"");
    expected.extend(common::frame(b"\"s0\""));
    assert_eq!(out.bytes(), expected);

    ctl.disable();
    assert!(!stats.is_installed());
}

#[test]
fn relay_survives_a_broken_channel() {
    struct Broken;
    impl std::io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let writer = FrameWriter::new(Broken);
    relay(
        &writer,
        PointerEvent::Scroll(ScrollEvent {
            delta_x: 0,
            delta_y: 1,
        }),
    );
}

#[test]
fn dropping_the_capturer_removes_the_hook() {
    let (hook, stats) = common::FakeHook::new();
    let mut capturer = PointerEventCapturer::new(hook, FrameWriter::new(common::SharedBuf::default()));
    capturer.start().unwrap();
    assert!(capturer.is_running());
    drop(capturer);
    assert_eq!(stats.uninstalls(), 1);
}
