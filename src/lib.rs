//! # mouse_commander
//!
//! The native half of **Mouse Commander**: a browser **native messaging host** that
//! reports global mouse clicks and scroll ticks to the extension, including the ones
//! a page or the browser sandbox never sees (clicks outside the window, on the
//! toolbar, during a drag, ...).
//!
//! ---
//!
//! ## Protocol
//!
//! The browser starts the host and talks to it over **stdin/stdout**. Every message
//! in either direction is:
//!
//! 1. a **4-byte length prefix** (`u32`) in **native endianness**,
//! 2. that many bytes of UTF-8 JSON.
//!
//! ### Extension → host
//!
//! Only one message means anything: the JSON string `"start_signal"`, sent right
//! after `connectNative`. It turns pointer capture on. Anything else is accepted and
//! ignored, so newer extensions can talk to older hosts.
//!
//! ### Host → extension
//!
//! Each pointer event is a short JSON string:
//!
//! | frame   | meaning                                                   |
//! |---------|-----------------------------------------------------------|
//! | `"cPB"` | button `B` (`0` left, `1` middle, `2` right) pressed (`P` = `1`) or released (`0`) |
//! | `"sD"`  | scroll tick; `D` is `1` when the vertical delta is positive, else `0` |
//!
//! Other buttons produce no frame.
//!
//! ### Lifecycle
//!
//! - Capture starts **disabled**. `"start_signal"` (or [`ControlHandle::enable`])
//!   installs the global hook; disabling removes it. Both are idempotent.
//! - **Disconnect is normal:** when the extension disconnects, the browser closes
//!   stdin. The host removes the hook and exits with status 0.
//! - A broken frame (truncated or not JSON) is fatal. There is no way to find the
//!   next frame boundary, so the host shuts down with status 1.
//! - **Never log to stdout.** stdout is the protocol. Logs go to stderr or a file
//!   (see [`config`]).
//!
//! ---
//!
//! ## Crate layout
//!
//! - [`codec`] — inbound frame decoding, outbound pointer frames.
//! - [`reader`] — the blocking stdin reader thread.
//! - [`dispatcher`] — the bounded queue and the task that acts on control tokens.
//! - [`capture`] — pointer hook backends and the capturer that relays events.
//! - [`lifecycle`] — the enable/disable state machine and [`ControlHandle`].
//! - [`host`] — wires all of the above to one channel.
//! - [`config`], [`logging`] — startup configuration and tracing setup.
//!
//! ---
//!
//! ## Framing without stdin/stdout
//!
//! ```rust
//! use mouse_commander::capture::PointerButton;
//! use mouse_commander::codec::{decode_inbound, encode_click, encode_message, MAX_FROM_BROWSER};
//! use serde_json::json;
//! use std::io::Cursor;
//!
//! let frame = encode_message(&"start_signal").unwrap();
//! let mut cur = Cursor::new(frame);
//! assert_eq!(decode_inbound(&mut cur, MAX_FROM_BROWSER).unwrap(), json!("start_signal"));
//!
//! let click = encode_click(PointerButton::Right, true).unwrap();
//! assert_eq!(&click.to_bytes()[4..], b"\"c12\"");
//! ```
//!
//! ---
//!
//! ## Embedding the host
//!
//! A tray or other UI drives the host through a [`ControlHandle`] and keeps its
//! toggle in sync through [`ControlHandle::subscribe`]:
//!
//! ```no_run
//! use mouse_commander::{capture, Host, HostConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let host = Host::new(HostConfig::default(), capture::system_hook(), std::io::stdout());
//!     let control = host.control();
//!
//!     // From any thread, e.g. a menu callback:
//!     control.enable(true);
//!
//!     let exit = host.run(std::io::stdin()).await.unwrap();
//!     std::process::exit(i32::from(exit.exit_code()));
//! }
//! ```

pub mod capture;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod reader;

#[doc(inline)]
pub use codec::{decode_inbound, encode_click, encode_message, encode_scroll};
#[doc(inline)]
pub use config::HostConfig;
#[doc(inline)]
pub use error::{ConfigError, HookError, NmError};
#[doc(inline)]
pub use host::{Host, HostExit};
#[doc(inline)]
pub use lifecycle::{CaptureState, ControlHandle, LifecycleController};
