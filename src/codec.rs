//! Native-messaging framing.
//!
//! Inbound (browser → host): 4-byte native-endian `u32` length, then that many
//! bytes of UTF-8 JSON.
//!
//! Outbound pointer frames (host → browser) are tiny JSON strings:
//!
//! | kind   | prefix | bytes after prefix                    |
//! |--------|--------|---------------------------------------|
//! | click  | 5      | `"` `c` `1`/`0` `0`/`1`/`2` `"`       |
//! | scroll | 4      | `"` `s` `1`/`0` `"`                   |
//!
//! The length counts the quote delimiters, so the extension receives `"c10"`,
//! `"s1"` and so on as ordinary string messages.

use std::io::{self, ErrorKind, Read, Write};

use serde::Serialize;
use serde_json::Value;

use crate::capture::PointerButton;
use crate::error::NmError;

/// Host → browser limit.
pub const MAX_TO_BROWSER: usize = 1_048_576;
/// Browser → host limit (Chrome documents 64 MiB).
pub const MAX_FROM_BROWSER: usize = 64 * 1_048_576;

const PREFIX_LEN: usize = 4;
const DELIMITER: u8 = b'"';
const CLICK_TAG: u8 = b'c';
const SCROLL_TAG: u8 = b's';

/// Reads into `buf` until it is full or the stream ends. Returns bytes read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read the 4-byte length prefix.
///
/// `Ok(None)` means the stream ended before any byte of a new frame arrived, i.e.
/// the browser closed the channel. A partial prefix is a truncated frame.
pub fn read_frame_len<R: Read>(r: &mut R, max_size: usize) -> Result<Option<usize>, NmError> {
    let mut len_buf = [0u8; PREFIX_LEN];
    let got = read_full(r, &mut len_buf)?;
    if got == 0 {
        return Ok(None);
    }
    if got < PREFIX_LEN {
        return Err(NmError::Truncated {
            expected: PREFIX_LEN,
            got,
        });
    }
    let len = u32::from_ne_bytes(len_buf) as usize;
    let cap = max_size.min(MAX_FROM_BROWSER);
    if len > cap {
        return Err(NmError::Framing(format!(
            "incoming message of {len} bytes exceeds limit of {cap}"
        )));
    }
    Ok(Some(len))
}

/// Read and parse a body of `len` bytes.
pub fn read_frame_body<R: Read>(r: &mut R, len: usize) -> Result<Value, NmError> {
    let mut buf = vec![0u8; len];
    let got = read_full(r, &mut buf)?;
    if got < len {
        return Err(NmError::Truncated { expected: len, got });
    }
    let text = String::from_utf8(buf).map_err(|e| NmError::Framing(e.to_string()))?;
    serde_json::from_str(&text).map_err(NmError::DeserializeJson)
}

/// Read one framed message, or `None` if the channel closed cleanly.
pub fn read_inbound<R: Read>(r: &mut R, max_size: usize) -> Result<Option<Value>, NmError> {
    match read_frame_len(&mut *r, max_size)? {
        Some(len) => read_frame_body(r, len).map(Some),
        None => Ok(None),
    }
}

/// Read one framed message. A clean end of stream is [`NmError::Disconnected`].
pub fn decode_inbound<R: Read>(r: &mut R, max_size: usize) -> Result<Value, NmError> {
    read_inbound(r, max_size)?.ok_or(NmError::Disconnected)
}

fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREFIX_LEN + body.len());
    out.extend_from_slice(&(body.len() as u32).to_ne_bytes());
    out.extend_from_slice(body);
    out
}

/// Encode any serde-serializable value into the native-messaging frame:
/// 4-byte native-endian length + JSON bytes.
pub fn encode_message<T: Serialize>(msg: &T) -> io::Result<Vec<u8>> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_TO_BROWSER {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            "outgoing message exceeds 1MB",
        ));
    }
    Ok(frame(&json))
}

/// A pointer event frame on its way to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundFrame {
    Click { pressed: bool, button: u8 },
    Scroll { positive: bool },
}

impl OutboundFrame {
    /// Frame body after the length prefix, quotes included: `"c10"`, `"s0"`, ...
    pub fn body(&self) -> Vec<u8> {
        match *self {
            Self::Click { pressed, button } => {
                vec![DELIMITER, CLICK_TAG, flag(pressed), button, DELIMITER]
            }
            Self::Scroll { positive } => vec![DELIMITER, SCROLL_TAG, flag(positive), DELIMITER],
        }
    }

    /// Full frame including the length prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        frame(&self.body())
    }
}

fn flag(set: bool) -> u8 {
    if set {
        b'1'
    } else {
        b'0'
    }
}

/// Click frame for a button transition. Buttons other than left, middle and right
/// produce no frame.
pub fn encode_click(button: PointerButton, pressed: bool) -> Option<OutboundFrame> {
    let button = match button {
        PointerButton::Left => b'0',
        PointerButton::Middle => b'1',
        PointerButton::Right => b'2',
        PointerButton::Other(_) => return None,
    };
    Some(OutboundFrame::Click { pressed, button })
}

/// Scroll frame. Only the sign of the vertical delta is sent; zero and horizontal
/// scrolling encode like a negative delta.
pub fn encode_scroll(delta_y: i64) -> OutboundFrame {
    OutboundFrame::Scroll {
        positive: delta_y > 0,
    }
}

/// Write one frame as a single contiguous write, then flush.
pub fn write_frame<W: Write + ?Sized>(w: &mut W, frame: &OutboundFrame) -> io::Result<()> {
    w.write_all(&frame.to_bytes())?;
    w.flush()
}
